//! 外部 HTTP 服务封装：CoW 报价与下单、Safe 交易服务、Telegram 通知。

pub mod cow;
pub mod safe;
pub mod serde_helpers;
pub mod telegram;

pub use cow::{CowApiClient, CowError, QuoteRequest};
pub use safe::{SafeService, SafeServiceError, SafeTransactionService};

const MAX_ERROR_BODY_CHARS: usize = 512;

/// 把错误响应体压缩成单行，避免日志被大段 HTML/JSON 淹没。
pub(crate) fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "(empty response body)".to_string();
    }
    let single_line = trimmed.replace(['\n', '\r'], " ");
    if single_line.chars().count() <= MAX_ERROR_BODY_CHARS {
        return single_line;
    }
    let mut truncated: String = single_line.chars().take(MAX_ERROR_BODY_CHARS).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::summarize_error_body;

    #[test]
    fn summarize_collapses_and_truncates() {
        assert_eq!(summarize_error_body("  \n "), "(empty response body)");
        assert_eq!(summarize_error_body("bad\nnonce"), "bad nonce");
        let long = "错".repeat(600);
        let summary = summarize_error_body(&long);
        assert_eq!(summary.chars().count(), 513);
        assert!(summary.ends_with('…'));
    }
}
