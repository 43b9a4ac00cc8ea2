//! Reversible share-code scheme for exchanging galaxy seeds.
//! Code format: FH-<WORD><NN>, e.g., FH-NEBULA42, FH-PULSAR07

fn fnv1a64(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash = (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME);
    }
    hash
}

fn sanitize_word(word: &str) -> String {
    word.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

// Word list for share codes
pub const WORD_LIST: [&str; 64] = [
    "NEBULA", "PULSAR", "QUASAR", "COMET", "METEOR", "HALO", "ORBIT", "APOGEE", "ZENITH", "NADIR",
    "PARSEC", "PHOTON", "ION", "PLASMA", "CORONA", "FLARE", "NOVA", "DWARF", "GIANT", "BINARY",
    "TRIDENT", "LANCER", "ESCORT", "CAPITAL", "BOMBER", "TANKER", "CARGO", "CONVOY", "BEACON",
    "RELAY", "SENSOR", "RADAR", "VECTOR", "THRUST", "BURN", "DRIFT", "DOCK", "BERTH", "HANGAR",
    "FORGE", "ANVIL", "BASTION", "CITADEL", "RAMPART", "REDOUBT", "OUTPOST", "COLONY", "HAVEN",
    "REFUGE", "FRONTIER", "MARGIN", "VERGE", "RIFT", "VOID", "ABYSS", "SHOAL", "REEF", "SPIRE",
    "CRADLE", "EMBER", "CINDER", "AURORA", "TWILIGHT", "DAWN",
];

#[inline]
fn pack(word_index: u16, nn: u8) -> u16 {
    word_index & 0x01FF | ((u16::from(nn) & 0x7F) << 9)
}

#[inline]
fn unpack(packed: u16) -> (u16, u8) {
    (packed & 0x01FF, ((packed >> 9) & 0x7F) as u8)
}

fn compose_seed(word_index: u16, nn: u8) -> u64 {
    let packed = pack(word_index, nn);
    // Domain-separated FNV input
    let mut buf = [0u8; 10];
    buf[..7].copy_from_slice(b"FARHOLD");
    buf[7] = (packed & 0xFF) as u8;
    buf[8] = (packed >> 8) as u8;
    buf[9] = 0xA5;
    let h = fnv1a64(&buf);
    (h & 0xFFFF_FFFF_FFFF_0000) | u64::from(packed)
}

#[must_use]
pub fn encode_friendly(seed: u64) -> String {
    let packed = (seed & 0xFFFF) as u16;
    let (wi, mut nn) = unpack(packed);
    let word = WORD_LIST.get(wi as usize).copied().unwrap_or("NEBULA");
    if nn > 99 {
        nn %= 100;
    }
    format!("FH-{word}{nn:02}")
}

#[must_use]
pub fn decode_to_seed(code: &str) -> Option<u64> {
    let s = code.trim();
    let (prefix, rest) = s.split_once('-')?;
    if !prefix.eq_ignore_ascii_case("FH") {
        return None;
    }
    if rest.len() < 3 {
        return None;
    }
    let (word_part, nn_part) = rest.split_at(rest.len() - 2);
    let nn: u8 = nn_part.parse().ok()?;
    let word = sanitize_word(word_part);
    let idx = WORD_LIST.iter().position(|w| sanitize_word(w) == word)?;
    let wi = u16::try_from(idx).ok()?;
    Some(compose_seed(wi, nn))
}

#[must_use]
pub fn generate_code_from_entropy(entropy: u64) -> String {
    let wi = u16::try_from(entropy % WORD_LIST.len() as u64).unwrap_or(0);
    let nn = ((entropy >> 17) % 100) as u8;
    let seed = compose_seed(wi, nn);
    encode_friendly(seed)
}
