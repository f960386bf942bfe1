use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses a stored decimal column, surfacing the column name on failure.
pub(crate) fn column_decimal(idx: usize, value: String) -> rusqlite::Result<Decimal> {
    Decimal::from_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parses an optional stored decimal column.
pub(crate) fn column_decimal_opt(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<Decimal>> {
    value.map(|v| column_decimal(idx, v)).transpose()
}

/// Parses a stored enum column through its `FromStr`.
pub(crate) fn column_enum<T: FromStr<Err = String>>(
    idx: usize,
    value: String,
) -> rusqlite::Result<T> {
    T::from_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            e.into(),
        )
    })
}

/// Parses an optional stored enum column.
pub(crate) fn column_enum_opt<T: FromStr<Err = String>>(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<T>> {
    value.map(|v| column_enum(idx, v)).transpose()
}
