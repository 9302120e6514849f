//! Test vectors in the JSON layout of the published BLAKE3 file: one case per
//! input length, holding an extended output for each of the three modes.

use anyhow::{bail, ensure, Context};
use blake3_engine::{Hasher, Mode, BLOCK_LEN, CHUNK_LEN, KEY_LEN, OUT_LEN};
use serde::{Deserialize, Serialize};

/// Two blocks and three bytes, so a failure to emit a trailing partial word
/// or to move on to the next output block shows up.
pub const OUTPUT_LEN: usize = 2 * BLOCK_LEN + 3;

pub const TEST_KEY: &[u8; KEY_LEN] = b"whats the Elvish word for friend";
pub const TEST_CONTEXT: &str = "BLAKE3 2019-12-27 16:29:52 test vectors context";

const COMMENT: &str = "Each case gives an input length and an extended output for each of the \
    hash, keyed_hash and derive_key modes, in hex. Input byte i is i % 251. keyed_hash uses \
    the `key` field below as its 32-byte key, and derive_key uses the `context_string` \
    field. The first 32 bytes of every output are also the default-length output.";

/// Small lengths, the bytes around each block and chunk edge, and a few
/// multi-level trees.
pub fn input_lengths() -> Vec<usize> {
    let mut lengths: Vec<usize> = (0..=8).collect();
    for edge in [BLOCK_LEN, 2 * BLOCK_LEN, CHUNK_LEN] {
        lengths.extend([edge - 1, edge, edge + 1]);
    }
    for chunks in 2..=8 {
        lengths.extend([chunks * CHUNK_LEN, chunks * CHUNK_LEN + 1]);
    }
    lengths.extend([16 * CHUNK_LEN, 31 * CHUNK_LEN, 100 * CHUNK_LEN]);
    lengths
}

pub fn painted_input(len: usize) -> Vec<u8> {
    (0..251u8).cycle().take(len).collect()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Cases {
    pub _comment: String,
    pub key: String,
    pub context_string: String,
    pub cases: Vec<Case>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub input_len: usize,
    pub hash: String,
    pub keyed_hash: String,
    pub derive_key: String,
}

impl Case {
    fn outputs(&self) -> [(&'static str, &str); 3] {
        [
            ("hash", self.hash.as_str()),
            ("keyed_hash", self.keyed_hash.as_str()),
            ("derive_key", self.derive_key.as_str()),
        ]
    }
}

// Same order as Case::outputs.
fn modes<'a>(key: &'a [u8], context: &'a str) -> [Mode<'a>; 3] {
    [Mode::Hash, Mode::KeyedHash(key), Mode::DeriveKey(context)]
}

fn extended_output(mode: Mode, input: &[u8], len: usize) -> anyhow::Result<Vec<u8>> {
    let mut hasher = Hasher::with_mode(mode)?;
    hasher.update(input);
    Ok(hasher.finalize_vec(len))
}

pub fn generate_json() -> anyhow::Result<String> {
    let mut cases = Vec::new();
    for input_len in input_lengths() {
        let input = painted_input(input_len);
        let [hash, keyed_hash, derive_key] = modes(TEST_KEY, TEST_CONTEXT)
            .map(|mode| extended_output(mode, &input, OUTPUT_LEN).map(hex::encode));
        cases.push(Case {
            input_len,
            hash: hash?,
            keyed_hash: keyed_hash?,
            derive_key: derive_key?,
        });
    }

    let mut json = serde_json::to_string_pretty(&Cases {
        _comment: COMMENT.to_string(),
        key: std::str::from_utf8(TEST_KEY)?.to_string(),
        context_string: TEST_CONTEXT.to_string(),
        cases,
    })?;
    json.push('\n');
    Ok(json)
}

pub fn parse_test_vectors(json: &str) -> anyhow::Result<Cases> {
    serde_json::from_str(json).context("failed to parse test vectors")
}

fn one_shot_into(mode: Mode, input: &[u8], out: &mut [u8]) -> anyhow::Result<()> {
    match mode {
        Mode::Hash => blake3_engine::hash_into(input, out),
        Mode::KeyedHash(key) => {
            let key: &[u8; KEY_LEN] = key.try_into()?;
            blake3_engine::keyed_hash_into(key, input, out);
        }
        Mode::DeriveKey(context) => blake3_engine::derive_key_into(context, input, out),
    }
    Ok(())
}

fn default_length(mode: Mode, input: &[u8]) -> anyhow::Result<[u8; OUT_LEN]> {
    Ok(match mode {
        Mode::Hash => blake3_engine::hash(input).into(),
        Mode::KeyedHash(key) => blake3_engine::try_keyed_hash(key, input)?.into(),
        Mode::DeriveKey(context) => blake3_engine::derive_key(context, input),
    })
}

// Every way of producing output in one mode has to agree with `expected`.
fn check_mode(mode: Mode, input: &[u8], expected: &[u8]) -> anyhow::Result<()> {
    ensure!(
        expected.len() >= OUT_LEN,
        "outputs must be at least {} bytes, found {}",
        OUT_LEN,
        expected.len(),
    );
    ensure!(default_length(mode, input)? == expected[..OUT_LEN], "default-length mismatch");

    let mut out = vec![0; expected.len()];
    one_shot_into(mode, input, &mut out)?;
    ensure!(out == expected, "one-shot mismatch");

    ensure!(extended_output(mode, input, expected.len())? == expected, "incremental mismatch");

    // One block per update, which stays fast on the 100-chunk case.
    let mut blockwise = Hasher::with_mode(mode)?;
    for block in input.chunks(BLOCK_LEN) {
        blockwise.update(block);
    }
    ensure!(
        blockwise.count() == input.len() as u64,
        "counted {} bytes, expected {}",
        blockwise.count(),
        input.len(),
    );
    let mut reader = blockwise.finalize_xof();
    let mut out = vec![0; expected.len()];
    reader.fill(&mut out);
    ensure!(out == expected, "blockwise mismatch");
    Ok(())
}

/// Check the engine against a parsed test vector file.
pub fn check_test_vectors(cases: &Cases) -> anyhow::Result<()> {
    let key = cases.key.as_bytes();
    if key.len() != KEY_LEN {
        bail!("key must be {} bytes, found {}", KEY_LEN, key.len());
    }
    for case in &cases.cases {
        let input = painted_input(case.input_len);
        let modes = modes(key, &cases.context_string);
        for (mode, (name, expected_hex)) in modes.into_iter().zip(case.outputs()) {
            let expected = hex::decode(expected_hex)
                .with_context(|| format!("{}, input_len {}", name, case.input_len))?;
            check_mode(mode, &input, &expected)
                .with_context(|| format!("{}, input_len {}", name, case.input_len))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generated_cases() -> Cases {
        parse_test_vectors(&generate_json().unwrap()).unwrap()
    }

    fn reference_hex(mut reference: reference_impl::Hasher, input: &[u8]) -> String {
        reference.update(input);
        let mut out = [0; OUTPUT_LEN];
        reference.finalize(&mut out);
        hex::encode(out)
    }

    #[test]
    fn test_generated_file_layout() {
        let json = generate_json().unwrap();
        assert!(json.ends_with("}\n"));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for field in ["_comment", "key", "context_string", "cases"] {
            assert!(value.get(field).is_some(), "missing {}", field);
        }

        let cases = parse_test_vectors(&json).unwrap();
        assert_eq!(cases.key.as_bytes(), TEST_KEY);
        assert_eq!(cases.context_string, TEST_CONTEXT);
        let lens: Vec<usize> = cases.cases.iter().map(|case| case.input_len).collect();
        assert_eq!(lens, input_lengths());
        assert!(lens.windows(2).all(|pair| pair[0] < pair[1]));
        for case in &cases.cases {
            for (name, output) in case.outputs() {
                assert_eq!(output.len(), 2 * OUTPUT_LEN, "{} {}", name, case.input_len);
            }
        }
    }

    // First 32 bytes of a few cases, as published alongside the algorithm.
    const PUBLISHED_PREFIXES: &[(usize, &str, &str)] = &[
        (0, "hash", "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"),
        (0, "keyed_hash", "92b2b75604ed3c761f9d6f62392c8a9227ad0ea3f09573e783f1498a4ed60d26"),
        (0, "derive_key", "2cc39783c223154fea8dfb7c1b1660f2ac2dcbd1c1de8277b0b0dd39b7e50d7d"),
        (1024, "hash", "42214739f095a406f3fc83deb889744ac00df831c10daa55189b5d121c855af7"),
        (1025, "hash", "d00278ae47eb27b34faecf67b4fe263f82d5412916c1ffd97c8cb7fb814b8444"),
        (2048, "hash", "e776b6028c7cd22a4d0ba182a8bf62205d2ef576467e838ed6f2529b85fba24a"),
        (2049, "keyed_hash", "9f29700902f7c86e514ddc4df1e3049f258b2472b6dd5267f61bf13983b78dd5"),
        (2049, "derive_key", "2ea477c5515cc3dd606512ee72bb3e0e758cfae7232826f35fb98ca1bcbdf273"),
    ];

    #[test]
    fn test_generated_vectors_match_published_prefixes() {
        let cases = generated_cases();
        for &(input_len, name, prefix) in PUBLISHED_PREFIXES {
            let case = cases.cases.iter().find(|case| case.input_len == input_len).unwrap();
            let (_, output) = case.outputs().into_iter().find(|(n, _)| *n == name).unwrap();
            assert!(output.starts_with(prefix), "{} {}: {}", name, input_len, output);
        }
    }

    #[test]
    fn test_generated_vectors_match_reference_impl() {
        for case in &generated_cases().cases {
            let input = painted_input(case.input_len);
            let references = [
                reference_impl::Hasher::new(),
                reference_impl::Hasher::new_keyed(TEST_KEY),
                reference_impl::Hasher::new_derive_key(TEST_CONTEXT),
            ];
            for (reference, (name, output)) in references.into_iter().zip(case.outputs()) {
                assert_eq!(output, reference_hex(reference, &input), "{} {}", name, case.input_len);
            }
        }
    }

    #[test]
    fn test_check_generated_vectors() {
        check_test_vectors(&generated_cases()).unwrap();
    }

    #[test]
    fn test_check_reports_the_failing_case() {
        let mut cases = generated_cases();
        cases.cases.truncate(20);
        let input_len = cases.cases[19].input_len;
        // Past the default-length prefix, so only the extended checks see it.
        let mut bytes = hex::decode(&cases.cases[19].derive_key).unwrap();
        bytes[OUTPUT_LEN - 1] ^= 1;
        cases.cases[19].derive_key = hex::encode(bytes);

        let message = format!("{:#}", check_test_vectors(&cases).unwrap_err());
        assert!(message.contains(&format!("derive_key, input_len {}", input_len)), "{}", message);
    }

    #[test]
    fn test_check_rejects_bad_files() {
        let mut cases = generated_cases();
        cases.cases.truncate(2);
        cases.key.pop();
        assert!(check_test_vectors(&cases).is_err());

        let mut cases = generated_cases();
        cases.cases.truncate(2);
        cases.cases[1].hash.truncate(10);
        assert!(check_test_vectors(&cases).is_err());

        let mut cases = generated_cases();
        cases.cases.truncate(2);
        cases.cases[0].keyed_hash.replace_range(..2, "zz");
        assert!(check_test_vectors(&cases).is_err());

        assert!(parse_test_vectors("{ not json").is_err());
    }
}
