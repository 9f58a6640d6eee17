//! Field codecs for values the service sends as JSON strings.

/// `Option<i64>` encoded as a decimal string, e.g. `"sizeBytes": "1024"`.
pub(crate) mod optional_i64_as_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_str(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| s.parse::<i64>().map_err(de::Error::custom))
            .transpose()
    }
}

/// `Option<Mime>` encoded as its essence string, e.g. `"image/jpeg"`.
pub(crate) mod optional_mime_as_string {
    use mime::Mime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Mime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_str(v.as_ref()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Mime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| s.parse::<Mime>().map_err(de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(default, with = "super::optional_i64_as_string")]
        size: Option<i64>,
        #[serde(default, with = "super::optional_mime_as_string")]
        mime: Option<mime::Mime>,
    }

    #[test]
    fn strings_are_parsed() {
        let sample: Sample =
            serde_json::from_value(json!({"size": "1024", "mime": "image/jpeg"})).unwrap();
        assert_eq!(sample.size, Some(1024));
        assert_eq!(sample.mime, Some(mime::IMAGE_JPEG));
        assert_eq!(
            serde_json::to_value(&sample).unwrap(),
            json!({"size": "1024", "mime": "image/jpeg"})
        );
    }

    #[test]
    fn missing_and_null_are_none() {
        let sample: Sample = serde_json::from_value(json!({"size": null})).unwrap();
        assert_eq!(sample, Sample { size: None, mime: None });
    }

    #[test]
    fn non_numeric_size_is_rejected() {
        assert!(serde_json::from_value::<Sample>(json!({"size": "big"})).is_err());
    }
}
