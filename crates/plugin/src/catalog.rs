//! Static capability table returned by the discovery call.

use crate::dispatch::FunctionId;
use crate::v1;

pub const PLUGIN_IDENTIFIER: &str = "SSE Rust Plugin";
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub data_type: v1::DataType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub name: &'static str,
    pub function_id: FunctionId,
    pub kind: v1::FunctionType,
    pub return_type: v1::DataType,
    pub params: &'static [ParamDescriptor],
}

const fn numeric(name: &'static str) -> ParamDescriptor {
    ParamDescriptor {
        name,
        data_type: v1::DataType::Numeric,
    }
}

pub const FUNCTIONS: [FunctionDescriptor; 3] = [
    FunctionDescriptor {
        name: "SumOfRows",
        function_id: FunctionId::SumOfRows,
        kind: v1::FunctionType::Scalar,
        return_type: v1::DataType::Numeric,
        params: &[numeric("Col1"), numeric("Col2")],
    },
    FunctionDescriptor {
        name: "SumOfColumn",
        function_id: FunctionId::SumOfColumn,
        kind: v1::FunctionType::Aggregation,
        return_type: v1::DataType::Numeric,
        params: &[numeric("Col1")],
    },
    FunctionDescriptor {
        name: "TwoNormRanking",
        function_id: FunctionId::TwoNormRanking,
        kind: v1::FunctionType::Tensor,
        return_type: v1::DataType::Numeric,
        params: &[numeric("Col1"), numeric("Col2")],
    },
];

impl FunctionDescriptor {
    pub fn to_proto(&self) -> v1::FunctionDefinition {
        v1::FunctionDefinition {
            name: self.name.to_string(),
            function_type: self.kind as i32,
            return_type: self.return_type as i32,
            params: self
                .params
                .iter()
                .map(|p| v1::Parameter {
                    data_type: p.data_type as i32,
                    name: p.name.to_string(),
                })
                .collect(),
            function_id: self.function_id.as_i32(),
        }
    }
}

/// Discovery response. Pure; every call yields the same message.
pub fn capabilities() -> v1::Capabilities {
    v1::Capabilities {
        allow_script: false,
        functions: FUNCTIONS.iter().map(FunctionDescriptor::to_proto).collect(),
        plugin_identifier: PLUGIN_IDENTIFIER.to_string(),
        plugin_version: PLUGIN_VERSION.to_string(),
    }
}
