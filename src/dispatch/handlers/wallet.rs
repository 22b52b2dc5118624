use serde_json::{json, Value};

use crate::blockchain::format::checksum;
use crate::dispatch::Services;
use crate::errors::failure::HandlerResult;
use crate::validation::schema::{missing, ValidatedParams};

/// The only response that ever carries a private key.
pub(super) fn create(services: &Services, params: &ValidatedParams) -> HandlerResult<Value> {
    let wallet = services.wallets.create(params.text("name").map(str::to_string))?;
    Ok(json!({
        "name": wallet.name(),
        "address": checksum(wallet.address()),
        "privateKey": wallet.private_key_hex(),
    }))
}

pub(super) fn import(services: &Services, params: &ValidatedParams) -> HandlerResult<Value> {
    let secret = params.secret("privateKey").ok_or_else(|| missing("privateKey"))?;
    let wallet = services
        .wallets
        .import(secret, params.text("name").map(str::to_string))?;
    Ok(json!({
        "name": wallet.name(),
        "address": checksum(wallet.address()),
    }))
}

pub(super) fn list(services: &Services) -> Value {
    let wallets: Vec<Value> = services
        .wallets
        .list()
        .into_iter()
        .map(|(name, address)| json!({ "name": name, "address": checksum(address) }))
        .collect();
    json!({ "wallets": wallets })
}
