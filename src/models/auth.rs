// src/models/auth.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// As claims vêm prontas do serviço de identidade (colaborador externo).
// O core apenas valida a assinatura e confia no escopo de instituição.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub institution_id: Uuid,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: usize,
    pub iat: usize,
}

/// O principal autenticado, disponível nos handlers via extractor.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub roles: Vec<String>,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            institution_id: claims.institution_id,
            roles: claims.roles,
        }
    }
}
