// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

#[macro_use]
extern crate log;
#[macro_use]
extern crate approx;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate getset;
#[macro_use]
extern crate derive_builder;
#[macro_use]
extern crate derive_new;

pub mod calling;
pub mod cli;
pub mod constants;
pub mod conversion;
pub mod errors;
pub mod observations;
pub(crate) mod reference;
pub mod utils;
pub mod variants;
