// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod settings;
pub mod friends;
pub mod expenses;
pub mod settle;
pub mod balance;
pub mod notifications;
pub mod importer;
pub mod exporter;
pub mod doctor;
