// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

#![allow(ambiguous_glob_reexports)]

pub use sparechange_core::*;

pub use crate::config::*;
pub use crate::engine::*;
pub use crate::*;
