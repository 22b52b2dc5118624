//! Operation handlers. Each receives already validated parameters.

mod contract;
mod query;
mod transaction;
mod wallet;

use serde_json::Value;

use crate::dispatch::{Call, Operation, Services};
use crate::errors::failure::HandlerResult;
use crate::validation::schema::ValidatedParams;

pub(crate) async fn handle(
    op: Operation,
    services: &Services,
    call: &Call,
    params: ValidatedParams,
) -> HandlerResult<Value> {
    match op {
        Operation::CreateWallet => wallet::create(services, &params),
        Operation::ImportWallet => wallet::import(services, &params),
        Operation::ListWallets => Ok(wallet::list(services)),
        Operation::GetBalance => query::balance(services, call, &params).await,
        Operation::GetTransactionCount => query::transaction_count(services, call, &params).await,
        Operation::GetBlockNumber => query::block_number(services).await,
        Operation::GetBlock => query::block(services, &params).await,
        Operation::GetGasPrice => query::gas_price(services).await,
        Operation::GetGasPriceEstimate => query::gas_price_estimate(services).await,
        Operation::GetTransaction => query::transaction(services, call, &params).await,
        Operation::GetTransactionReceipt => query::receipt(services, call, &params).await,
        Operation::GetTransactionHistory => query::history(services, call, &params).await,
        Operation::EstimateGas => transaction::estimate_gas(services, &params).await,
        Operation::SendTransaction => transaction::send(services, call, &params).await,
        Operation::SendRawTransaction => transaction::send_raw(services, call, &params).await,
        Operation::WaitForReceipt => transaction::wait_for_receipt(services, call, &params).await,
        Operation::ContractLoad => contract::load(services, &params),
        Operation::ContractList => Ok(contract::list(services)),
        Operation::ContractDeploy => contract::deploy(services, call, &params).await,
        Operation::ContractCall => contract::call(services, call, &params).await,
        Operation::ContractRead => contract::read(services, call, &params).await,
        Operation::ContractGetEvents => contract::events(services, call, &params).await,
    }
}
