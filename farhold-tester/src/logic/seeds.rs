use anyhow::{Result, bail};
use farhold_game::seed::{decode_to_seed, encode_friendly, generate_code_from_entropy};
use std::collections::HashMap;

/// Seed metadata carried through scenario runs and reports.
#[derive(Debug, Clone)]
pub struct SeedInfo {
    pub seed: u64,
    /// Share code the seed arrived as, if it arrived as one.
    pub code: Option<String>,
}

impl SeedInfo {
    #[must_use]
    pub fn from_numeric(seed: u64) -> Self {
        Self { seed, code: None }
    }

    #[must_use]
    pub fn from_share_code(seed: u64, code: String) -> Self {
        Self {
            seed,
            code: Some(code),
        }
    }

    /// Label for banners and reports: the share code when the seed has one,
    /// otherwise the closest code spelling of its low bits.
    #[must_use]
    pub fn share_code(&self) -> String {
        self.code.clone().unwrap_or_else(|| encode_friendly(self.seed))
    }
}

/// Resolve CLI seed tokens into canonical seed metadata.
///
/// Accepts literal integers, `FH-` share codes, and the keyword `random`
/// which draws a fresh shareable seed. Duplicates collapse; an empty list
/// falls back to the default seed 1337.
///
/// # Errors
///
/// Returns an error on any token that is neither numeric, a valid share
/// code, nor `random`.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut pending: Vec<SeedInfo> = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        if token.eq_ignore_ascii_case("random") {
            let code = generate_code_from_entropy(rand::random::<u64>());
            let seed = decode_to_seed(&code)
                .expect("entropy codes always decode");
            pending.push(SeedInfo::from_share_code(seed, code));
            continue;
        }

        if let Ok(value) = token.parse::<i64>() {
            pending.push(SeedInfo::from_numeric(value.unsigned_abs()));
            continue;
        }

        if let Ok(value) = token.parse::<u64>() {
            pending.push(SeedInfo::from_numeric(value));
            continue;
        }

        if let Some(seed) = decode_to_seed(token) {
            pending.push(SeedInfo::from_share_code(seed, token.to_uppercase()));
            continue;
        }

        bail!("Unrecognized seed token: {token}");
    }

    let mut deduped: Vec<SeedInfo> = Vec::new();
    let mut index: HashMap<u64, usize> = HashMap::new();
    for info in pending {
        if let Some(existing) = index.get(&info.seed) {
            let entry = deduped
                .get_mut(*existing)
                .expect("index map points to existing entry");
            if entry.code.is_none() && info.code.is_some() {
                *entry = info;
            }
        } else {
            index.insert(info.seed, deduped.len());
            deduped.push(info);
        }
    }

    if deduped.is_empty() {
        deduped.push(SeedInfo::from_numeric(1337));
    }

    Ok(deduped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_numeric_and_share_code() {
        let raw = vec![
            "42".to_string(),
            "-7".to_string(),
            "FH-NEBULA42".to_string(),
        ];
        let seeds = resolve_seed_inputs(&raw).unwrap();
        assert!(seeds.iter().any(|s| s.seed == 42 && s.code.is_none()));
        assert!(seeds.iter().any(|s| s.seed == 7 && s.code.is_none()));
        assert!(
            seeds
                .iter()
                .any(|s| s.code.as_deref() == Some("FH-NEBULA42"))
        );
    }

    #[test]
    fn random_tokens_always_yield_decodable_codes() {
        let seeds = resolve_seed_inputs(&["random".to_string()]).unwrap();
        assert_eq!(seeds.len(), 1);
        let code = seeds[0].code.as_deref().expect("random seeds carry a code");
        assert_eq!(decode_to_seed(code), Some(seeds[0].seed));
    }

    #[test]
    fn duplicates_collapse_preferring_the_coded_spelling() {
        let seed = decode_to_seed("FH-NEBULA42").unwrap();
        let raw = vec![seed.to_string(), "FH-NEBULA42".to_string()];
        let seeds = resolve_seed_inputs(&raw).unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].code.as_deref(), Some("FH-NEBULA42"));
    }

    #[test]
    fn empty_input_falls_back_to_default_seed() {
        let seeds = resolve_seed_inputs(&[]).unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].seed, 1337);
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        assert!(resolve_seed_inputs(&["not-a-seed".to_string()]).is_err());
    }
}
