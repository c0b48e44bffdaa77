// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Library entry exposing the Knight bootstrap toolchain modules.

pub mod codec;
pub mod core;
pub mod m1;
pub mod vm;
