// SPDX-License-Identifier: GPL-3.0-only

//! User input triggers for one-shot decodes

pub mod clipboard;
pub mod file;

pub use clipboard::ClipboardItem;
