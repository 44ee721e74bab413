//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

pub mod storage;
