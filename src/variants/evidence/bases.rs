// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use bio::stats::{LogProb, PHREDProb};

use crate::utils::PROB_033;

/// Calculate probability of an observed allele given that it stems from the given
/// genotype allele.
pub(crate) fn prob_read_allele(is_match: bool, base_qual: u8) -> LogProb {
    if is_match {
        prob_read_base_call(base_qual)
    } else {
        // TODO replace the second term with technology specific confusion matrix
        prob_read_base_miscall(base_qual) + *PROB_033
    }
}

/// Unpack probability of a correct base call.
pub(crate) fn prob_read_base_call(base_qual: u8) -> LogProb {
    BASEQUAL_TO_PROB_CALL[base_qual as usize]
}

/// Unpack miscall probability of a base call.
pub(crate) fn prob_read_base_miscall(base_qual: u8) -> LogProb {
    BASEQUAL_TO_PROB_MISCALL[base_qual as usize]
}

fn _prob_read_base_miscall(base_qual: u8) -> LogProb {
    LogProb::from(PHREDProb::from(base_qual as f64))
}

lazy_static! {
    static ref BASEQUAL_TO_PROB_MISCALL: [LogProb; 256] = {
        let mut probs = [LogProb::ln_zero(); 256];
        for (qual, prob) in (0u8..=255u8).map(|qual| (qual, _prob_read_base_miscall(qual))) {
            probs[qual as usize] = prob;
        }
        probs
    };
    static ref BASEQUAL_TO_PROB_CALL: [LogProb; 256] = {
        let mut probs = [LogProb::ln_zero(); 256];
        for (qual, prob) in BASEQUAL_TO_PROB_MISCALL.iter().enumerate() {
            probs[qual] = prob.ln_one_minus_exp();
        }
        probs
    };
}
