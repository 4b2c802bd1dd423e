// Copyright (C) Microsoft Corporation. All rights reserved.

use zeroize::Zeroizing;

use super::hmac;
use super::HashAlgorithm;
use super::HashEngine;
use crate::error::*;

#[derive(Clone)]
enum HashState {
    Active {
        inner: HashEngine,
        outer: Option<HashEngine>,
    },
    Finished,
}

/// State behind a hash handle.
///
/// A non-reusable object accepts data until it is finished once. A reusable
/// object starts over, HMAC key schedule included, after every finish.
pub(crate) struct HashObject {
    alg: HashAlgorithm,
    reusable: bool,
    secret: Option<Zeroizing<Vec<u8>>>,
    state: HashState,
}

impl HashObject {
    /// Creates a plain hash, or an HMAC when `hmac_secret` is set.
    pub(crate) fn new(
        alg: HashAlgorithm,
        hmac_secret: Option<&[u8]>,
        reusable: bool,
    ) -> BcryptResult<Self> {
        let secret = match hmac_secret {
            Some(secret) => Some(Zeroizing::new(try_copy(secret)?)),
            None => None,
        };

        let state = Self::initial_state(alg, secret.as_deref().map(Vec::as_slice));
        Ok(Self {
            alg,
            reusable,
            secret,
            state,
        })
    }

    fn initial_state(alg: HashAlgorithm, secret: Option<&[u8]>) -> HashState {
        match secret {
            Some(secret) => {
                let engines = hmac::key_schedule(alg, secret);
                HashState::Active {
                    inner: engines.inner,
                    outer: Some(engines.outer),
                }
            }
            None => HashState::Active {
                inner: HashEngine::new(alg),
                outer: None,
            },
        }
    }

    pub(crate) fn algorithm(&self) -> HashAlgorithm {
        self.alg
    }

    pub(crate) fn is_hmac(&self) -> bool {
        self.secret.is_some()
    }

    /// Feeds `data` to the inner engine. The outer engine stays untouched.
    pub(crate) fn update(&mut self, data: &[u8]) -> BcryptResult<()> {
        match &mut self.state {
            HashState::Active { inner, .. } => {
                inner.update(data);
                Ok(())
            }
            HashState::Finished => Err(BcryptError::InvalidState),
        }
    }

    /// Writes the digest or MAC into `out`, which must be exactly the
    /// digest length.
    pub(crate) fn finish(&mut self, out: &mut [u8]) -> BcryptResult<()> {
        if out.len() != self.alg.digest_len() {
            tracing::error!(
                expected = self.alg.digest_len(),
                actual = out.len(),
                "Hash output size mismatch"
            );
            Err(BcryptError::InvalidParameter)?;
        }

        let state = std::mem::replace(&mut self.state, HashState::Finished);
        match state {
            HashState::Active { inner, outer: None } => inner.finish(out),
            HashState::Active {
                inner,
                outer: Some(outer),
            } => hmac::finish(inner, outer, out),
            HashState::Finished => Err(BcryptError::InvalidState)?,
        }

        if self.reusable {
            self.state = Self::initial_state(self.alg, self.secret.as_deref().map(Vec::as_slice));
        }
        Ok(())
    }

    /// Copies the full running state, both engines included.
    pub(crate) fn try_clone(&self) -> BcryptResult<Self> {
        let secret = match &self.secret {
            Some(secret) => Some(Zeroizing::new(try_copy(secret)?)),
            None => None,
        };
        Ok(Self {
            alg: self.alg,
            reusable: self.reusable,
            secret,
            state: self.state.clone(),
        })
    }
}
