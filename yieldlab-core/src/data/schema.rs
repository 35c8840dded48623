use polars::prelude::*;

/// Columns every market-data frame must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = ["date", "code", "open", "high", "low", "close"];

/// Expected shape of a source frame of daily bars
pub struct SourceSchema;

impl SourceSchema {
    /// Validate a DataFrame before converting it to bars.
    ///
    /// Extra columns are allowed. `date` may be Date, Datetime or String;
    /// prices may be any float or 32/64-bit integer type.
    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        let schema = df.schema();

        for name in REQUIRED_COLUMNS {
            if !schema.contains(name) {
                return Err(SchemaError::MissingColumn(name.to_string()));
            }
        }

        for name in REQUIRED_COLUMNS {
            let dtype = schema
                .get(name)
                .ok_or_else(|| SchemaError::MissingColumn(name.to_string()))?;
            let ok = match name {
                "date" => matches!(
                    dtype,
                    DataType::Date | DataType::Datetime(_, _) | DataType::String
                ),
                "code" => matches!(dtype, DataType::String),
                _ => is_price_dtype(dtype),
            };
            if !ok {
                return Err(SchemaError::TypeMismatch {
                    column: name.to_string(),
                    actual: dtype.clone(),
                });
            }
        }

        Ok(())
    }
}

fn is_price_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float64
            | DataType::Float32
            | DataType::Int64
            | DataType::Int32
            | DataType::UInt64
            | DataType::UInt32
    )
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Unsupported type in column {column}: {actual:?}")]
    TypeMismatch { column: String, actual: DataType },
}
