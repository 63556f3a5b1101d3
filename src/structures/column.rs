use core::fmt;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::db_err::DBError;


pub const DATE_FORMAT: &str = "%Y-%m-%d";


#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Column {
    name: String,
    data_type: DataType,
    is_primary_key: bool
}


impl Column {
    pub fn new(name: &str, data_type: DataType, is_primary_key: bool) -> Self {
        Column { name: name.to_string(), data_type, is_primary_key }
    }

    pub fn get_name(&self)       -> &str      { &self.name }
    pub fn get_data_type(&self)  -> &DataType { &self.data_type }
    pub fn is_primary_key(&self) -> bool      { self.is_primary_key }
    pub fn change_pk_state(&mut self, is_pk: bool)  { self.is_primary_key = is_pk; }
    pub fn new_name(&mut self, new_name: String) { self.name = new_name; }
}


#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Float,
    String,
    Date,
    Boolean
}


impl DataType {
    /// returns the corresponding datatype for the following:
    /// 1. "integer" OR "int" -> Integer
    /// 2. "float" OR "number" -> Float
    /// 3. "date" -> Date
    /// 4. "boolean" OR "bool" -> Boolean
    /// 5. "string" OR "str" -> String
    pub fn parse_str(str: &str) -> Option<DataType> {
        match str.trim().to_lowercase().as_str() {
            "integer" | "int"   => Some(DataType::Integer),
            "float" | "number"  => Some(DataType::Float),
            "date"              => Some(DataType::Date),
            "boolean" | "bool"  => Some(DataType::Boolean),
            "string" | "str"    => Some(DataType::String),
            _ => None
        }
    }

    pub fn is_numeric(&self) -> bool { matches!(self, DataType::Integer | DataType::Float) }
}


/// a single cell. `Null` is a valid value for every column type.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    Boolean(bool),
    Null
}


impl FieldValue {

    /// parses raw text (a CSV cell or user input) into a value of `data_type`.
    ///
    /// ## Note
    /// an empty string is `Null` for every datatype
    pub fn parse(raw: &str, data_type: &DataType) -> Result<FieldValue, DBError> {
        if raw.is_empty() { return Ok(FieldValue::Null) }

        let invalid = || DBError::validation(format!("'{raw}' is not a valid {data_type}"));
        let trimmed = raw.trim();

        match data_type {
            DataType::String  => Ok(FieldValue::String(raw.to_string())),
            DataType::Integer => trimmed.parse::<i64>().map(FieldValue::Integer).map_err(|_| invalid()),
            DataType::Float   => trimmed.parse::<f64>().map(FieldValue::Float).map_err(|_| invalid()),
            DataType::Boolean => match trimmed.to_lowercase().as_str() {
                "true"  => Ok(FieldValue::Boolean(true)),
                "false" => Ok(FieldValue::Boolean(false)),
                _ => Err(invalid())
            },
            DataType::Date => parse_date(trimmed).map(FieldValue::Date).ok_or_else(invalid),
        }
    }


    /// the text written to a CSV cell; `Null` becomes an empty cell
    pub fn to_csv_field(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            // keep a decimal point so the value reads back as a float
            FieldValue::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => format!("{v:.1}"),
            other => other.to_string(),
        }
    }


    /// # NOTE
    /// returns `None` for a `Null` value
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            FieldValue::Integer(_) => Some(DataType::Integer),
            FieldValue::Float(_)   => Some(DataType::Float),
            FieldValue::String(_)  => Some(DataType::String),
            FieldValue::Date(_)    => Some(DataType::Date),
            FieldValue::Boolean(_) => Some(DataType::Boolean),
            FieldValue::Null       => None,
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, FieldValue::Null) }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Float(v)   => Some(*v),
            _ => None
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(v) => Some(v),
            _ => None
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None
        }
    }


    /// converts the value so it can be stored in a column of type `data_type`.
    ///
    /// integers are widened into float columns, everything else must already match.
    /// empty text becomes `Null`, the same value an empty CSV cell reads back as.
    pub fn coerce_to(self, data_type: &DataType) -> Result<FieldValue, DBError> {
        match (self, data_type) {
            (FieldValue::Null, _) => Ok(FieldValue::Null),
            (FieldValue::String(s), _) if s.is_empty() => Ok(FieldValue::Null),
            (FieldValue::Integer(v), DataType::Float) => Ok(FieldValue::Float(v as f64)),
            (value, expected) => {
                let actual = value.data_type().unwrap_or(*expected);
                if actual == *expected { Ok(value) }
                else { Err(DBError::MisMatchDataType(*expected, actual)) }
            }
        }
    }


    /// total ordering used when sorting a column.
    ///
    /// numbers compare across `Integer` and `Float`, `Null` always sorts last,
    /// and values of unrelated types fall back to a fixed type rank.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        fn rank(v: &FieldValue) -> u8 {
            match v {
                FieldValue::Boolean(_) => 0,
                FieldValue::Integer(_) | FieldValue::Float(_) => 1,
                FieldValue::Date(_) => 2,
                FieldValue::String(_) => 3,
                FieldValue::Null => 4,
            }
        }

        match (self, other) {
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::String(a), FieldValue::String(b)) => a.cmp(b),
            (FieldValue::Date(a), FieldValue::Date(b)) => a.cmp(b),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a.cmp(b),
            (a, b) if rank(a) == 1 && rank(b) == 1 => {
                // both are numbers, safe to unwrap via defaults
                a.as_f64().unwrap_or_default().total_cmp(&b.as_f64().unwrap_or_default())
            }
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}


/// accepts `YYYY-MM-DD`, optionally followed by a time which is dropped
pub fn parse_date(str: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(str, DATE_FORMAT) {
        return Some(date);
    }
    NaiveDateTime::parse_from_str(str, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(str, "%Y-%m-%dT%H:%M:%S"))
        .map(|dt| dt.date())
        .ok()
}


/// narrowest datatype every non-empty cell parses as.
///
/// ## Note
/// tries Boolean, Integer, Float then Date before falling back to `String`.
/// a column with no values at all is treated as `String`.
pub fn infer_data_type<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> DataType {
    let candidates = [DataType::Boolean, DataType::Integer, DataType::Float, DataType::Date];
    let mut non_empty = cells.filter(|c| !c.is_empty()).peekable();
    if non_empty.peek().is_none() { return DataType::String }

    for candidate in candidates {
        if non_empty.clone().all(|c| FieldValue::parse(c, &candidate).is_ok()) {
            return candidate;
        }
    }
    DataType::String
}


impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(l0), Self::Integer(r0)) => l0 == r0,
            (Self::Float(l0), Self::Float(r0)) => l0 == r0 || (l0.is_nan() && r0.is_nan()),
            (Self::String(l0), Self::String(r0)) => l0 == r0,
            (Self::Date(l0), Self::Date(r0)) => l0 == r0,
            (Self::Boolean(l0), Self::Boolean(r0)) => l0 == r0,
            (Self::Null, Self::Null) => true,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}


impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            FieldValue::Integer(v) => v.hash(state),
            FieldValue::Float(v)   => canonical_bits(*v).hash(state),
            FieldValue::String(v)  => v.hash(state),
            FieldValue::Date(v)    => v.hash(state),
            FieldValue::Boolean(v) => v.hash(state),
            FieldValue::Null       => (),
        }
    }
}


/// equal floats must hash the same, so `-0.0` and every NaN share one bit pattern
fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 { 0.0f64.to_bits() }
    else if v.is_nan() { f64::NAN.to_bits() }
    else { v.to_bits() }
}


impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Float(v)   => write!(f, "{v}"),
            FieldValue::String(v)  => write!(f, "{v}"),
            FieldValue::Date(v)    => write!(f, "{}", v.format(DATE_FORMAT)),
            FieldValue::Boolean(v) => write!(f, "{v}"),
            FieldValue::Null       => write!(f, "Null")
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Integer => write!(f, "Integer"),
            DataType::Float   => write!(f, "Float"),
            DataType::String  => write!(f, "String"),
            DataType::Date    => write!(f, "Date"),
            DataType::Boolean => write!(f, "Boolean"),
        }
    }
}


impl From<i64> for FieldValue { fn from(v: i64) -> Self { FieldValue::Integer(v) } }
impl From<f64> for FieldValue { fn from(v: f64) -> Self { FieldValue::Float(v) } }
impl From<bool> for FieldValue { fn from(v: bool) -> Self { FieldValue::Boolean(v) } }
impl From<&str> for FieldValue { fn from(v: &str) -> Self { FieldValue::String(v.to_string()) } }
impl From<String> for FieldValue { fn from(v: String) -> Self { FieldValue::String(v) } }
impl From<NaiveDate> for FieldValue { fn from(v: NaiveDate) -> Self { FieldValue::Date(v) } }


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cells_are_null_for_every_type() {
        for dt in [DataType::Integer, DataType::Float, DataType::String, DataType::Date, DataType::Boolean] {
            assert_eq!(FieldValue::parse("", &dt).unwrap(), FieldValue::Null);
        }
    }

    #[test]
    fn parse_typed_values() {
        assert_eq!(FieldValue::parse(" 42", &DataType::Integer).unwrap(), FieldValue::Integer(42));
        assert_eq!(FieldValue::parse("2.5", &DataType::Float).unwrap(), FieldValue::Float(2.5));
        assert_eq!(FieldValue::parse("TRUE", &DataType::Boolean).unwrap(), FieldValue::Boolean(true));
        assert_eq!(
            FieldValue::parse("2024-03-01 10:15:00", &DataType::Date).unwrap(),
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
        assert!(matches!(FieldValue::parse("abc", &DataType::Integer), Err(DBError::Validation(_))));
    }

    #[test]
    fn floats_keep_a_decimal_point_in_csv() {
        assert_eq!(FieldValue::Float(150.0).to_csv_field(), "150.0");
        assert_eq!(FieldValue::Float(0.1 + 0.2).to_csv_field(), "0.30000000000000004");
        assert_eq!(FieldValue::Null.to_csv_field(), "");
    }

    #[test]
    fn integers_widen_into_float_columns() {
        assert_eq!(FieldValue::Integer(3).coerce_to(&DataType::Float).unwrap(), FieldValue::Float(3.0));
        assert!(matches!(
            FieldValue::from("x").coerce_to(&DataType::Integer),
            Err(DBError::MisMatchDataType(DataType::Integer, DataType::String))
        ));
    }

    #[test]
    fn nulls_sort_last() {
        let mut values = vec![FieldValue::Null, FieldValue::Float(2.5), FieldValue::Integer(1)];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(values, vec![FieldValue::Integer(1), FieldValue::Float(2.5), FieldValue::Null]);
    }

    #[test]
    fn infers_narrowest_type() {
        assert_eq!(infer_data_type(["1", "", "3"].into_iter()), DataType::Integer);
        assert_eq!(infer_data_type(["1", "2.5"].into_iter()), DataType::Float);
        assert_eq!(infer_data_type(["2024-01-02"].into_iter()), DataType::Date);
        assert_eq!(infer_data_type(["true", "False"].into_iter()), DataType::Boolean);
        assert_eq!(infer_data_type(["a", "1"].into_iter()), DataType::String);
        assert_eq!(infer_data_type(["", ""].into_iter()), DataType::String);
    }
}
