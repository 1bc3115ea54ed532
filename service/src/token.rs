//! [`Issuer`] of [`Session`] [`Token`]s.

use derive_more::{Debug, Display, Error};
use jsonwebtoken::{
    errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret as _, SecretString};

use crate::domain::user::{session::Token, Session};

/// Issuer and verifier of [JWT]s signed with HS256.
///
/// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
#[derive(Clone, Debug)]
pub struct Issuer {
    /// Key to sign new [`Token`]s with.
    #[debug(skip)]
    encoding_key: EncodingKey,

    /// Key to verify [`Token`] signatures with.
    #[debug(skip)]
    decoding_key: DecodingKey,

    /// Rules of [`Token`]s verification.
    validation: Validation,
}

impl Issuer {
    /// Creates a new [`Issuer`] deriving its keys from the provided `secret`.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let secret = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issues a new signed [`Token`] carrying the provided [`Session`].
    ///
    /// # Errors
    ///
    /// If failed to serialize or sign the [`Session`] claims.
    pub fn issue(
        &self,
        session: &Session,
    ) -> Result<Token, jsonwebtoken::errors::Error> {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            session,
            &self.encoding_key,
        )
        .map(Token::from)
    }

    /// Verifies the provided [`Token`] and returns the [`Session`] it
    /// carries.
    ///
    /// A [`Token`] is accepted through the second of its expiration.
    ///
    /// # Errors
    ///
    /// With a [`VerifyError`] describing why the [`Token`] is rejected.
    pub fn verify(&self, token: &Token) -> Result<Session, VerifyError> {
        jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.decoding_key,
            &self.validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            let kind = e.into_kind();
            if matches!(kind, ErrorKind::InvalidSignature) {
                VerifyError::SignatureMismatch
            } else if matches!(kind, ErrorKind::ExpiredSignature) {
                VerifyError::Expired
            } else {
                VerifyError::Malformed
            }
        })
    }
}

/// Reason of a [`Token`] being rejected by an [`Issuer`].
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum VerifyError {
    /// [`Token`] is not a well-formed [JWT] of a [`Session`].
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[display("Malformed token")]
    Malformed,

    /// [`Token`] is signed with another secret or tampered.
    #[display("Token signature mismatch")]
    SignatureMismatch,

    /// [`Token`] has expired.
    #[display("Token has expired")]
    Expired,
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use secrecy::SecretString;

    use crate::domain::user::{
        session::{self, Token},
        Session,
    };

    use super::{Issuer, VerifyError};

    fn issuer(secret: &str) -> Issuer {
        Issuer::new(&SecretString::from(secret.to_owned()))
    }

    fn session(expires_in_secs: i64) -> Session {
        let now = DateTime::now().unix_timestamp();
        Session {
            id: session::Id::new(),
            expires_at: DateTime::from_unix_timestamp(now + expires_in_secs)
                .unwrap()
                .coerce(),
        }
    }

    #[test]
    fn verifies_issued_token() {
        let issuer = issuer("secret");
        let session = session(60);

        let token = issuer.issue(&session).unwrap();

        assert_eq!(issuer.verify(&token).unwrap(), session);
    }

    #[test]
    fn rejects_expired_token() {
        let issuer = issuer("secret");
        let token = issuer.issue(&session(-2)).unwrap();

        assert_eq!(issuer.verify(&token), Err(VerifyError::Expired));
    }

    #[test]
    fn rejects_foreign_signature() {
        let token = issuer("other").issue(&session(60)).unwrap();

        assert_eq!(
            issuer("secret").verify(&token),
            Err(VerifyError::SignatureMismatch),
        );
    }

    #[test]
    fn rejects_tampered_token() {
        let genuine = issuer("secret");
        let token: String = genuine.issue(&session(60)).unwrap().into();

        let forged = session(3600);
        let forged = issuer("other").issue(&forged).unwrap();
        let forged: String = forged.into();
        let (_, sig) = token.rsplit_once('.').unwrap();
        let (payload, _) = forged.rsplit_once('.').unwrap();

        assert_eq!(
            genuine.verify(&Token::from(format!("{payload}.{sig}"))),
            Err(VerifyError::SignatureMismatch),
        );
    }

    #[test]
    fn rejects_garbage() {
        let issuer = issuer("secret");

        for token in ["", "abc", "a.b.c", "Bearer x"] {
            assert_eq!(
                issuer.verify(&Token::from(token.to_owned())),
                Err(VerifyError::Malformed),
            );
        }
    }
}
