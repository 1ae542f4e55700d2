use custody_ledger::domain::payment::{PaymentDetails, SealedPayload};
use custody_ledger::domain::ports::PayloadCipher;
use custody_ledger::error::DecryptError;
use custody_ledger::infrastructure::codec::{MasterKey, TokenCodec};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Number, Value};

fn card() -> PaymentDetails {
    let json =
        r#"{"cardNumber":"4111111111111111","expiry":"12/29","cvv":"123","pin":4321,"primary":true}"#;
    PaymentDetails::from_json(json).unwrap()
}

#[test]
fn test_badtoken_is_malformed() {
    let codec = TokenCodec::embedded();
    let result = codec.open(&SealedPayload::new("badtoken".to_string()));
    assert_eq!(result, Err(DecryptError::MalformedToken));
}

#[test]
fn test_round_trip_both_modes() {
    for codec in [TokenCodec::embedded(), TokenCodec::enveloped(MasterKey::generate())] {
        let token = codec.seal(&card()).unwrap();
        assert_eq!(token.as_str().split('.').count(), 3);
        assert_eq!(codec.open(&token).unwrap(), card());
    }
}

fn random_text(rng: &mut StdRng, max_len: usize) -> String {
    let len = rng.gen_range(0..=max_len);
    (0..len)
        .map(|_| match rng.gen_range(0..3) {
            0 => rng.gen_range('a'..='z'),
            1 => rng.gen_range('\u{80}'..='\u{2FFF}'),
            _ => rng.r#gen::<char>(),
        })
        .collect()
}

fn random_scalar(rng: &mut StdRng) -> Value {
    match rng.gen_range(0..7) {
        0 => Value::Null,
        1 => Value::Bool(rng.gen_bool(0.5)),
        2 => Value::Number(Number::from(rng.r#gen::<i64>())),
        3 => Value::Number(Number::from(rng.r#gen::<u64>())),
        4 => Number::from_f64(rng.gen_range(-1.0e12..1.0e12))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        5 => Value::String(String::new()),
        _ => Value::String(random_text(rng, 64)),
    }
}

fn random_details(rng: &mut StdRng) -> PaymentDetails {
    let mut fields = Map::new();
    for _ in 0..rng.gen_range(0..=24) {
        fields.insert(random_text(rng, 16), random_scalar(rng));
    }
    // Long values so the ciphertext spans many CBC blocks.
    if rng.gen_bool(0.25) {
        fields.insert("memo".to_string(), Value::String(random_text(rng, 4096)));
    }
    PaymentDetails::from_json(&Value::Object(fields).to_string()).unwrap()
}

#[test]
fn test_random_payloads_round_trip_both_modes() {
    let mut rng = StdRng::seed_from_u64(0x5eed_c0de);
    let codecs = [TokenCodec::embedded(), TokenCodec::enveloped(MasterKey::generate())];

    for _ in 0..200 {
        let details = random_details(&mut rng);
        for codec in &codecs {
            let token = codec.seal(&details).unwrap();
            assert_eq!(codec.open(&token).unwrap(), details);
        }
    }
}

#[test]
fn test_ciphertext_tamper_is_detected() {
    let codec = TokenCodec::embedded();
    let token = codec.seal(&card()).unwrap();
    let parts: Vec<&str> = token.as_str().split('.').collect();

    let mut ciphertext: Vec<char> = parts[1].chars().collect();
    ciphertext[0] = if ciphertext[0] == 'A' { 'B' } else { 'A' };
    let tampered = format!("{}.{}.{}", parts[0], ciphertext.iter().collect::<String>(), parts[2]);

    assert_eq!(
        codec.open(&SealedPayload::new(tampered)),
        Err(DecryptError::DecodeFailure)
    );
}

#[test]
fn test_envelope_token_needs_its_master_key() {
    let sealed = TokenCodec::enveloped(MasterKey::generate()).seal(&card()).unwrap();

    assert_eq!(TokenCodec::embedded().open(&sealed), Err(DecryptError::DecodeFailure));
    assert_eq!(
        TokenCodec::enveloped(MasterKey::generate()).open(&sealed),
        Err(DecryptError::DecodeFailure)
    );
}
