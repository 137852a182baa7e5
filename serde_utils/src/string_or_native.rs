// The Beacon Node API represents integers as decimal strings.
// Records persisted with `bincode` store them natively instead.
//
// `deserialize_any` is only used for human-readable formats because `bincode` does not support it.

use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    marker::PhantomData,
    str::FromStr,
};

use serde::{
    de::{Error, IntoDeserializer as _, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Deserialize<'de> + FromStr<Err: Display>,
    D: Deserializer<'de>,
{
    struct StringOrIntegerVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de> + FromStr<Err: Display>> Visitor<'de>
        for StringOrIntegerVisitor<T>
    {
        type Value = T;

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str("a decimal string or an unsigned integer")
        }

        fn visit_str<E: Error>(self, string: &str) -> Result<Self::Value, E> {
            string.parse().map_err(E::custom)
        }

        fn visit_u64<E: Error>(self, value: u64) -> Result<Self::Value, E> {
            T::deserialize(value.into_deserializer())
        }
    }

    if deserializer.is_human_readable() {
        deserializer.deserialize_any(StringOrIntegerVisitor(PhantomData))
    } else {
        T::deserialize(deserializer)
    }
}

pub fn serialize<S: Serializer>(
    value: impl Serialize + Display,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.collect_str(&value)
    } else {
        value.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Result as JsonResult};
    use test_case::test_case;

    use super::*;

    #[derive(PartialEq, Eq, Debug, Deserialize, Serialize)]
    #[serde(transparent)]
    struct Slot(#[serde(with = "super")] u64);

    #[test_case(json!("123"); "decimal string")]
    #[test_case(json!(123); "native integer")]
    fn deserializes_from_json(json: serde_json::Value) -> JsonResult<()> {
        assert_eq!(serde_json::from_value::<Slot>(json)?, Slot(123));
        Ok(())
    }

    #[test]
    fn serializes_to_string_in_json() -> JsonResult<()> {
        assert_eq!(serde_json::to_value(Slot(u64::MAX))?, json!("18446744073709551615"));
        Ok(())
    }

    #[test]
    fn rejects_non_decimal_strings() {
        assert!(serde_json::from_value::<Slot>(json!("0x10")).is_err());
    }

    #[test]
    fn stays_native_in_bincode() -> bincode::Result<()> {
        let encoded = bincode::serialize(&Slot(5))?;

        assert_eq!(encoded, 5_u64.to_le_bytes());
        assert_eq!(bincode::deserialize::<Slot>(&encoded)?, Slot(5));

        Ok(())
    }
}
