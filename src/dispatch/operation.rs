//! Operation names and their parameter schemas.

use std::fmt;

use crate::validation::schema::{FieldRule, Schema};

/// Every operation the gateway serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateWallet,
    ImportWallet,
    ListWallets,
    GetBalance,
    GetTransactionCount,
    GetBlockNumber,
    GetBlock,
    GetGasPrice,
    GetGasPriceEstimate,
    GetTransaction,
    GetTransactionReceipt,
    GetTransactionHistory,
    EstimateGas,
    SendTransaction,
    SendRawTransaction,
    WaitForReceipt,
    ContractLoad,
    ContractList,
    ContractDeploy,
    ContractCall,
    ContractRead,
    ContractGetEvents,
}

impl Operation {
    pub const ALL: [Operation; 22] = [
        Self::CreateWallet,
        Self::ImportWallet,
        Self::ListWallets,
        Self::GetBalance,
        Self::GetTransactionCount,
        Self::GetBlockNumber,
        Self::GetBlock,
        Self::GetGasPrice,
        Self::GetGasPriceEstimate,
        Self::GetTransaction,
        Self::GetTransactionReceipt,
        Self::GetTransactionHistory,
        Self::EstimateGas,
        Self::SendTransaction,
        Self::SendRawTransaction,
        Self::WaitForReceipt,
        Self::ContractLoad,
        Self::ContractList,
        Self::ContractDeploy,
        Self::ContractCall,
        Self::ContractRead,
        Self::ContractGetEvents,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateWallet => "eth_createWallet",
            Self::ImportWallet => "eth_importWallet",
            Self::ListWallets => "eth_listWallets",
            Self::GetBalance => "eth_getBalance",
            Self::GetTransactionCount => "eth_getTransactionCount",
            Self::GetBlockNumber => "eth_getBlockNumber",
            Self::GetBlock => "eth_getBlock",
            Self::GetGasPrice => "eth_getGasPrice",
            Self::GetGasPriceEstimate => "eth_getGasPriceEstimate",
            Self::GetTransaction => "eth_getTransaction",
            Self::GetTransactionReceipt => "eth_getTransactionReceipt",
            Self::GetTransactionHistory => "eth_getTransactionHistory",
            Self::EstimateGas => "eth_estimateGas",
            Self::SendTransaction => "eth_sendTransaction",
            Self::SendRawTransaction => "eth_sendRawTransaction",
            Self::WaitForReceipt => "eth_waitForReceipt",
            Self::ContractLoad => "contract_load",
            Self::ContractList => "contract_list",
            Self::ContractDeploy => "contract_deploy",
            Self::ContractCall => "contract_call",
            Self::ContractRead => "contract_read",
            Self::ContractGetEvents => "contract_getEvents",
        }
    }

    /// Parameter rules checked before the handler runs.
    pub fn schema(&self) -> Schema {
        use FieldRule::*;

        let schema = Schema::new();
        match self {
            Self::CreateWallet => schema.optional("name", Text),
            Self::ImportWallet => schema
                .required("privateKey", PrivateKey)
                .optional("name", Text),
            Self::ListWallets
            | Self::GetBlockNumber
            | Self::GetGasPrice
            | Self::GetGasPriceEstimate
            | Self::ContractList => schema,
            Self::GetBalance | Self::GetTransactionCount => schema
                .required("address", Address)
                .optional("block", Block),
            Self::GetBlock => schema
                .required("block", Block)
                .optional("fullTransactions", Bool),
            Self::GetTransaction | Self::GetTransactionReceipt => schema.required("hash", Hash),
            Self::GetTransactionHistory => schema
                .required("address", Address)
                .optional("startBlock", U64)
                .optional("endBlock", U64),
            Self::EstimateGas => schema
                .optional("from", Address)
                .optional("to", Address)
                .optional("value", Wei)
                .optional("data", Hex),
            Self::SendTransaction => schema
                .required("from", Address)
                .optional("to", Address)
                .optional("value", Wei)
                .optional("gas", GasLimit)
                .optional("gasPrice", GasPrice)
                .optional("data", Hex)
                .optional("nonce", Nonce),
            Self::SendRawTransaction => schema.required("signedTransaction", Hex),
            Self::WaitForReceipt => schema
                .required("hash", Hash)
                .optional("timeoutSecs", U64),
            Self::ContractLoad => schema
                .required("address", Address)
                .required("abi", Abi)
                .optional("name", Text),
            Self::ContractDeploy => schema
                .required("bytecode", Bytecode)
                .required("abi", Abi)
                .optional("args", Array)
                .required("from", Address)
                .optional("gas", GasLimit)
                .optional("gasPrice", GasPrice)
                .optional("value", Wei),
            Self::ContractCall => schema
                .required("contractAddress", Address)
                .required("method", Text)
                .optional("args", Array)
                .required("from", Address)
                .optional("gas", GasLimit)
                .optional("gasPrice", GasPrice)
                .optional("value", Wei),
            Self::ContractRead => schema
                .required("contractAddress", Address)
                .required("method", Text)
                .optional("args", Array)
                .optional("block", Block),
            Self::ContractGetEvents => schema
                .required("contractAddress", Address)
                .required("eventName", Text)
                .optional("fromBlock", Block)
                .optional("toBlock", Block)
                .optional("filters", Object),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
