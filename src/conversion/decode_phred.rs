use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::utils::stats::phred_to_prob;

/// Convert a PHRED scaled confidence into the probability of the called event.
fn decode_score(score: &mut Value) {
    if let Some(phred) = score.as_f64() {
        let prob = 1.0 - phred_to_prob(phred);
        if let Some(prob) = serde_json::Number::from_f64(prob) {
            *score = Value::Number(prob);
        }
    }
}

/// Decode PHRED scaled genotype and variant scores of genotyping results to
/// linear posterior probabilities.
pub fn decode_phred<R: BufRead, W: Write>(input: R, mut output: W) -> Result<()> {
    for (i, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut record: Value = serde_json::from_str(&line)
            .with_context(|| format!("invalid genotyping result in line {}", i + 1))?;

        if let Some(variant) = record.get_mut("variant") {
            decode_score(variant);
        }
        if let Some(samples) = record.get_mut("samples").and_then(Value::as_object_mut) {
            for sample in samples.values_mut() {
                if let Some(genotypes) = sample
                    .get_mut("genotypes")
                    .and_then(Value::as_object_mut)
                {
                    genotypes.values_mut().for_each(decode_score);
                }
            }
        }

        serde_json::to_writer(&mut output, &record)?;
        writeln!(output)?;
    }
    output.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_phred() {
        let input = r#"{"sequence":"chr1","position":"5","samples":{"s1":{"coverage":3,"genotypes":{"ref/ref":20.0,"ref/A":0.0}}}}"#;
        let mut out = Vec::new();
        decode_phred(input.as_bytes(), &mut out).unwrap();
        let record: Value = serde_json::from_slice(&out).unwrap();
        let genotypes = &record["samples"]["s1"]["genotypes"];
        assert_relative_eq!(genotypes["ref/ref"].as_f64().unwrap(), 0.99, epsilon = 1e-9);
        assert_relative_eq!(genotypes["ref/A"].as_f64().unwrap(), 0.0);
        assert_eq!(record["samples"]["s1"]["coverage"], 3);
        assert_eq!(
            genotypes.as_object().unwrap().keys().collect::<Vec<_>>(),
            vec!["ref/ref", "ref/A"]
        );
    }

    #[test]
    fn test_invalid_line() {
        let mut out = Vec::new();
        assert!(decode_phred("{\"sequence\"".as_bytes(), &mut out).is_err());
    }
}
