// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use bio::stats::{LogProb, Prob};

pub mod multichoose;
pub mod stats;

pub use multichoose::multichoose;

lazy_static! {
    pub(crate) static ref PROB_033: LogProb = LogProb::from(Prob(1.0 / 3.0));
}

/// Cap log probabilities that exceed one by numerical inaccuracy.
pub(crate) fn cap_at_one(prob: LogProb) -> LogProb {
    if *prob > 0.0 {
        LogProb::ln_one()
    } else {
        prob
    }
}
