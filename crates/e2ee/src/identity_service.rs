//! IdentityService – Langzeit-Identitaetsschluessel erzeugen, laden, veroeffentlichen

use std::sync::Arc;

use litechat_core::{CacheSchluessel, UserId};
use litechat_crypto::{IdentityKeyPair, IdentityKeyTexts};
use litechat_records::{collections, RecordBody, RecordStore};

use crate::context::E2eeContext;
use crate::error::{E2eeError, E2eeResult};
use crate::types::UserProfile;

/// Verwaltet das RSA-OAEP Schluessel-Paar des lokalen Benutzers
pub struct IdentityService<R: RecordStore> {
    ctx: E2eeContext<R>,
}

impl<R: RecordStore> IdentityService<R> {
    pub fn neu(ctx: E2eeContext<R>) -> Arc<Self> {
        Arc::new(Self { ctx })
    }

    /// Erzeugt ein neues Schluessel-Paar und legt den privaten Teil im Cache ab
    ///
    /// Beide Haelften werden als JWK-Text zurueckgegeben; der Aufrufer
    /// veroeffentlicht den oeffentlichen Teil.
    pub async fn generate_identity_keypair(&self) -> E2eeResult<IdentityKeyTexts> {
        let params = self.ctx.params;
        let texts = self
            .ctx
            .blockierend(move |backend| IdentityKeyPair::generate(backend, &params)?.to_texts())
            .await?;

        self.ctx
            .cache
            .speichern(&CacheSchluessel::PrivateKey, &texts.private_key_text)?;
        tracing::info!(bits = params.rsa_modulus_bits, "Neues Identitaets-Schluessel-Paar erzeugt");
        Ok(texts)
    }

    /// Laedt den privaten Schluessel, `None` wenn keiner im Cache liegt
    ///
    /// `None` ist kein Fehler: der Aufrufer leitet zum Import weiter.
    pub fn load_identity_private_key(&self) -> E2eeResult<Option<IdentityKeyPair>> {
        self.ctx.identitaet_laden()
    }

    /// Veroeffentlicht den oeffentlichen Schluessel, falls das Profil noch keinen hat
    ///
    /// Liegt lokal bereits ein privater Schluessel, wird dessen oeffentlicher
    /// Teil verwendet, sonst ein neues Paar erzeugt. Gibt `true` zurueck wenn
    /// das Profil aktualisiert wurde.
    pub async fn ensure_published(&self, user: &UserId) -> E2eeResult<bool> {
        let profil: UserProfile = self
            .ctx
            .records
            .get_one(collections::USERS, user.as_str())
            .await?
            .parse()?;

        if !profil.public_key.trim().is_empty() {
            return Ok(false);
        }

        let public_key_text = match self.load_identity_private_key()? {
            Some(identity) => identity.public_jwk_text()?,
            None => self.generate_identity_keypair().await?.public_key_text,
        };

        self.ctx
            .records
            .update(
                collections::USERS,
                user.as_str(),
                RecordBody::new().feld("publicKey", public_key_text),
            )
            .await?;

        tracing::info!(user_id = %user, "Oeffentlicher Schluessel veroeffentlicht");
        Ok(true)
    }

    /// Veroeffentlichter oeffentlicher Schluessel eines Benutzers (JWK-Text)
    pub async fn public_key_text(&self, user: &UserId) -> E2eeResult<String> {
        oeffentlichen_schluessel_laden(&self.ctx, user).await
    }
}

pub(crate) async fn oeffentlichen_schluessel_laden<R: RecordStore>(
    ctx: &E2eeContext<R>,
    user: &UserId,
) -> E2eeResult<String> {
    let profil: UserProfile = ctx
        .records
        .get_one(collections::USERS, user.as_str())
        .await?
        .parse()?;

    if profil.public_key.trim().is_empty() {
        return Err(E2eeError::KeinOeffentlicherSchluessel {
            user_id: user.to_string(),
        });
    }
    Ok(profil.public_key)
}
