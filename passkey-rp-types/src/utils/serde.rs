//! Serde helpers for the tolerance the webauthn spec demands of parsers.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};

/// Many webauthn fields carry the wording:
///
/// > The values SHOULD be members of `T` but platforms MUST ignore unknown
/// > values.
///
/// This falls back to `T::default()` instead of failing deserialization.
pub(crate) fn ignore_unknown<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(T::deserialize(de).unwrap_or_default())
}

/// Variant of [`ignore_unknown`] for optional lists: elements that fail to
/// parse are dropped rather than failing the whole sequence.
///
/// Each element is buffered as a JSON value first so a failed parse cannot
/// poison the remainder of the sequence; these fields only ever arrive over
/// the JSON transport.
pub(crate) fn ignore_unknown_opt_vec<'de, D, T>(de: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw: Option<Vec<serde_json::Value>> = Deserialize::deserialize(de)?;
    Ok(raw.map(|values| {
        values
            .into_iter()
            .filter_map(|value| T::deserialize(value).ok())
            .collect()
    }))
}

pub(crate) mod i64_to_iana {
    use coset::iana::EnumI64;

    pub(crate) fn serialize<S, T>(value: &T, ser: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: EnumI64,
    {
        ser.serialize_i64(value.to_i64())
    }

    pub(crate) fn deserialize<'de, D, T>(de: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: EnumI64,
    {
        let value: i64 = serde::Deserialize::deserialize(de)?;

        T::from_i64(value).ok_or_else(|| {
            <D::Error as serde::de::Error>::invalid_value(
                serde::de::Unexpected::Signed(value),
                &"an iana::Algorithm value",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::ignore_unknown_opt_vec;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Known {
        Usb,
        Nfc,
    }

    #[derive(Debug, Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "ignore_unknown_opt_vec")]
        values: Option<Vec<Known>>,
    }

    #[test]
    fn unknown_elements_are_dropped_not_fatal() {
        let holder: Holder =
            serde_json::from_str(r#"{"values": ["usb", "carrier-pigeon", "nfc"]}"#).unwrap();
        assert_eq!(holder.values, Some(vec![Known::Usb, Known::Nfc]));
    }

    #[test]
    fn missing_field_stays_none() {
        let holder: Holder = serde_json::from_str("{}").unwrap();
        assert!(holder.values.is_none());
    }
}
