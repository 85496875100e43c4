//! Multi-signature payloads in JWS JSON serialization.
//!
//! Only the subset advertisements need: ECDSA signatures, an integrity
//! protected header of `{"alg","cty","kid"}`, and an attached payload.
//! Output uses the flattened form for one signature and the general form for
//! several. Input may be flattened, general or compact.
//!
//! Parsing never trusts anything. Callers read the payload with
//! [`SignedPayload::unverified_payload`], decide which keys are allowed to
//! vouch for it, then check signatures explicitly.

use serde::{Deserialize, Serialize};

use crate::{
    b64,
    curve::SignatureAlgorithm,
    error::KeyError,
    key::{Algorithm, KeyMaterial},
};

/// `cty` of an advertisement payload.
pub const KEY_SET_CONTENT_TYPE: &str = "jwk-set+json";

#[derive(Debug, Serialize, Deserialize)]
struct ProtectedHeader {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireSignature {
    protected: String,
    signature: String,
}

#[derive(Serialize)]
struct Flattened<'a> {
    payload: &'a str,
    protected: &'a str,
    signature: &'a str,
}

#[derive(Serialize)]
struct General<'a> {
    payload: &'a str,
    signatures: Vec<WireSignature>,
}

#[derive(Deserialize)]
struct WireDocument {
    payload: String,
    #[serde(default)]
    protected: Option<String>,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    signatures: Option<Vec<WireSignature>>,
}

#[derive(Debug, Clone)]
struct Signature {
    protected: String,
    algorithm: SignatureAlgorithm,
    content_type: Option<String>,
    kid: Option<String>,
    value: Vec<u8>,
}

/// A payload with one or more ECDSA signatures over it.
#[derive(Debug, Clone)]
pub struct SignedPayload {
    payload: String,
    signatures: Vec<Signature>,
}

impl SignedPayload {
    /// Sign `payload` once per signer.
    ///
    /// Each signer must hold its private scalar and carry either no `alg` or
    /// the ECDSA algorithm matching its curve.
    ///
    /// # Errors
    ///
    /// - `Signing`: no signers, a signer is public-only, or its `alg` cannot
    ///   sign on its curve
    pub fn sign(
        payload: &[u8],
        content_type: &str,
        signers: &[&KeyMaterial],
    ) -> Result<Self, KeyError> {
        if signers.is_empty() {
            return Err(KeyError::Signing { reason: "no signing keys".to_string() });
        }

        let payload = b64::encode(payload);
        let mut signatures = Vec::with_capacity(signers.len());
        for signer in signers {
            let d = signer
                .scalar()
                .ok_or_else(|| KeyError::Signing { reason: "signing key is public-only".into() })?;
            let algorithm = signing_algorithm(signer)?;
            let header = ProtectedHeader {
                alg: algorithm.name().to_string(),
                cty: Some(content_type.to_string()),
                kid: signer.kid().map(str::to_string),
            };
            let header = serde_json::to_vec(&header)
                .map_err(|err| KeyError::Signing { reason: err.to_string() })?;
            let protected = b64::encode(&header);
            let value = signer.curve().sign(d, signing_input(&protected, &payload).as_bytes())?;

            signatures.push(Signature {
                protected,
                algorithm,
                content_type: Some(content_type.to_string()),
                kid: signer.kid().map(str::to_string),
                value,
            });
        }

        Ok(Self { payload, signatures })
    }

    /// JSON serialization: flattened for one signature, general otherwise.
    pub fn to_json(&self) -> Result<Vec<u8>, KeyError> {
        let encoded = match self.signatures.as_slice() {
            [only] => serde_json::to_vec(&Flattened {
                payload: &self.payload,
                protected: &only.protected,
                signature: &b64::encode(&only.value),
            }),
            many => serde_json::to_vec(&General {
                payload: &self.payload,
                signatures: many
                    .iter()
                    .map(|sig| WireSignature {
                        protected: sig.protected.clone(),
                        signature: b64::encode(&sig.value),
                    })
                    .collect(),
            }),
        };
        encoded.map_err(|err| KeyError::Signing { reason: err.to_string() })
    }

    /// Decode a signed payload without verifying anything.
    ///
    /// Every signature must use one of the `accepted` algorithms.
    ///
    /// # Errors
    ///
    /// - `SignatureVerification`: malformed document, no signatures, or a
    ///   signature algorithm outside `accepted`
    pub fn parse(bytes: &[u8], accepted: &[SignatureAlgorithm]) -> Result<Self, KeyError> {
        let text = std::str::from_utf8(bytes).map_err(|_| KeyError::signature("not UTF-8"))?;
        let text = text.trim();

        let (payload, wire) = if text.starts_with('{') {
            let doc: WireDocument = serde_json::from_str(text)
                .map_err(|err| KeyError::signature(format!("malformed JWS: {err}")))?;
            let wire = match (doc.signatures, doc.protected, doc.signature) {
                (Some(signatures), None, None) => signatures,
                (None, Some(protected), Some(signature)) => vec![WireSignature { protected, signature }],
                _ => return Err(KeyError::signature("ambiguous or missing JWS signatures")),
            };
            (doc.payload, wire)
        } else {
            let mut parts = text.split('.');
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(protected), Some(payload), Some(signature), None) => (
                    payload.to_string(),
                    vec![WireSignature {
                        protected: protected.to_string(),
                        signature: signature.to_string(),
                    }],
                ),
                _ => return Err(KeyError::signature("compact JWS must have three parts")),
            }
        };

        if wire.is_empty() {
            return Err(KeyError::signature("no signatures"));
        }

        let signatures = wire
            .into_iter()
            .map(|sig| decode_signature(sig, accepted))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { payload, signatures })
    }

    /// The payload bytes. Nothing has been verified.
    pub fn unverified_payload(&self) -> Result<Vec<u8>, KeyError> {
        b64::decode(&self.payload).map_err(|_| KeyError::signature("payload is not base64url"))
    }

    /// Number of signatures.
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// `cty` of each signature, in order.
    pub fn content_types(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.signatures.iter().map(|sig| sig.content_type.as_deref())
    }

    /// Check signature `index` against `key`.
    ///
    /// # Errors
    ///
    /// - `SignatureVerification`: out of range, algorithm and curve disagree,
    ///   or the signature does not verify
    pub fn verify_signature(&self, index: usize, key: &KeyMaterial) -> Result<(), KeyError> {
        let sig = self
            .signatures
            .get(index)
            .ok_or_else(|| KeyError::signature(format!("no signature at index {index}")))?;

        if sig.algorithm.curve() != key.curve() {
            return Err(KeyError::signature(format!(
                "{} signature cannot be checked with a {} key",
                sig.algorithm,
                key.curve()
            )));
        }
        if let (Some(expected), Some(actual)) = (key.kid(), sig.kid.as_deref()) {
            if expected != actual {
                return Err(KeyError::signature("kid mismatch"));
            }
        }

        let input = signing_input(&sig.protected, &self.payload);
        key.curve().verify(key.x(), key.y(), input.as_bytes(), &sig.value).map_err(|err| match err {
            KeyError::SignatureVerification { .. } => err,
            other => KeyError::signature(other.to_string()),
        })
    }

    /// Index of the first signature that verifies under `key`.
    pub fn verify_with(&self, key: &KeyMaterial) -> Result<usize, KeyError> {
        (0..self.signatures.len())
            .find(|&index| self.verify_signature(index, key).is_ok())
            .ok_or_else(|| KeyError::signature("no signature verifies under the given key"))
    }
}

fn signing_input(protected: &str, payload: &str) -> String {
    format!("{protected}.{payload}")
}

fn signing_algorithm(key: &KeyMaterial) -> Result<SignatureAlgorithm, KeyError> {
    let expected = key.curve().signature_algorithm();
    match key.algorithm() {
        None => Ok(expected),
        Some(Algorithm::Signature(alg)) if *alg == expected => Ok(expected),
        Some(other) => Err(KeyError::Signing {
            reason: format!("algorithm {} cannot sign with a {} key", other.as_str(), key.curve()),
        }),
    }
}

fn decode_signature(
    wire: WireSignature,
    accepted: &[SignatureAlgorithm],
) -> Result<Signature, KeyError> {
    let header = b64::decode(&wire.protected)
        .map_err(|_| KeyError::signature("protected header is not base64url"))?;
    let header: ProtectedHeader = serde_json::from_slice(&header)
        .map_err(|err| KeyError::signature(format!("malformed protected header: {err}")))?;

    let algorithm = SignatureAlgorithm::from_name(&header.alg)
        .filter(|alg| accepted.contains(alg))
        .ok_or_else(|| KeyError::signature(format!("algorithm {:?} not accepted", header.alg)))?;

    let value = b64::decode(&wire.signature)
        .map_err(|_| KeyError::signature("signature is not base64url"))?;

    Ok(Signature {
        protected: wire.protected,
        algorithm,
        content_type: header.cty,
        kid: header.kid,
        value,
    })
}
