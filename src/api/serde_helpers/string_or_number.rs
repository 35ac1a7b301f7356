//! 服务端可能以 JSON 数字或字符串返回的字段。

use serde::{Deserialize, Deserializer, de};

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw {
    Number(u64),
    Text(String),
}

/// 反序列化为 `u64`，兼容 `5` 与 `"5"`。
pub fn deserialize_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|err| de::Error::custom(format!("无法解析整数 `{text}`: {err}"))),
    }
}

/// 反序列化为 `String`，数字按十进制转成字符串。
pub fn deserialize_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value.to_string()),
        Raw::Text(text) => Ok(text),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "super::deserialize_u64")]
        nonce: u64,
        #[serde(deserialize_with = "super::deserialize_string")]
        id: String,
    }

    #[test]
    fn accepts_numbers_and_strings() {
        let a: Sample = serde_json::from_str(r#"{"nonce":5,"id":"abc"}"#).expect("parse");
        let b: Sample = serde_json::from_str(r#"{"nonce":"5","id":42}"#).expect("parse");
        assert_eq!(a.nonce, 5);
        assert_eq!(b.nonce, 5);
        assert_eq!(a.id, "abc");
        assert_eq!(b.id, "42");
    }
}
