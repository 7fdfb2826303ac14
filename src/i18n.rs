//! User-visible fixed strings, per locale.

use std::str::FromStr;
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    Ja,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en_us" => Ok(Locale::En),
            "ja" | "ja-jp" | "ja_jp" => Ok(Locale::Ja),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

pub struct Strings {
    pub question_template: &'static str,
    pub no_description: &'static str,
    pub analysis_complete: &'static str,
    pub analysis_error_prefix: &'static str,
    pub send_error_prefix: &'static str,
    pub send_failed_notice: &'static str,
    pub generic_error: &'static str,
    pub untitled: &'static str,
    pub image_header: &'static str,
    pub image_description: &'static str,
    pub image_alt: &'static str,
}

const EN: Strings = Strings {
    question_template: "How can I resolve the issue in the following case? Case details: {description}",
    no_description: "No description provided.",
    analysis_complete: "Case analysis is complete. Type a question if you need more help.",
    analysis_error_prefix: "An error occurred while analyzing the case: ",
    send_error_prefix: "An error occurred while sending the message: ",
    send_failed_notice: "An error occurred. Please try again.",
    generic_error: "unknown error",
    untitled: "Untitled",
    image_header: "Image {n}",
    image_description: "Related image",
    image_alt: "Related image {n}",
};

const JA: Strings = Strings {
    question_template: "次のケースについて、問題を解決するにはどうすればよいですか？。ケースの内容: {description}",
    no_description: "説明がありません。",
    analysis_complete: "ケースの分析が完了しました。質問がある場合は入力してください。",
    analysis_error_prefix: "ケースの分析中にエラーが発生しました: ",
    send_error_prefix: "メッセージの送信中にエラーが発生しました: ",
    send_failed_notice: "エラーが発生しました。もう一度お試しください。",
    generic_error: "不明なエラー",
    untitled: "無題",
    image_header: "画像 {n}",
    image_description: "関連する画像です",
    image_alt: "関連画像 {n}",
};

const MESSAGE_TIME_FORMAT_12H: &[FormatItem<'static>] =
    format_description!("[hour repr:12 padding:zero]:[minute padding:zero] [period case:upper]");

const MESSAGE_TIME_FORMAT_24H: &[FormatItem<'static>] =
    format_description!("[hour padding:zero]:[minute padding:zero]");

impl Locale {
    pub fn strings(self) -> &'static Strings {
        match self {
            Locale::En => &EN,
            Locale::Ja => &JA,
        }
    }

    /// Opening question sent to the analysis service for a case.
    pub fn default_question(self, description: Option<&str>) -> String {
        let strings = self.strings();
        let description = description
            .filter(|d| !d.is_empty())
            .unwrap_or(strings.no_description);
        strings
            .question_template
            .replace("{description}", description)
    }

    /// Transcript time label in local time, falling back to UTC when the
    /// local offset cannot be determined.
    pub fn format_timestamp(self, at: OffsetDateTime) -> String {
        let mut datetime = at;
        if let Ok(offset) = UtcOffset::current_local_offset() {
            datetime = datetime.to_offset(offset);
        }
        let format = match self {
            Locale::En => MESSAGE_TIME_FORMAT_12H,
            Locale::Ja => MESSAGE_TIME_FORMAT_24H,
        };
        datetime.format(format).unwrap_or_default()
    }
}

impl Strings {
    /// `prefix` followed by the backend detail, or the generic fallback when
    /// there is none. Never empty.
    pub fn compose_error(&self, prefix: &str, detail: Option<&str>) -> String {
        let detail = detail
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(self.generic_error);
        format!("{prefix}{detail}")
    }

    pub fn numbered(template: &str, n: usize) -> String {
        template.replace("{n}", &n.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_parse_locale() {
        assert_eq!("ja".parse::<Locale>(), Ok(Locale::Ja));
        assert_eq!("EN-us".parse::<Locale>(), Ok(Locale::En));
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn test_default_question_falls_back_on_missing_description() {
        let q = Locale::En.default_question(None);
        assert!(q.ends_with("No description provided."));
        let q = Locale::En.default_question(Some(""));
        assert!(q.ends_with("No description provided."));
        let q = Locale::Ja.default_question(Some("ログインできない"));
        assert!(q.ends_with("ケースの内容: ログインできない"));
    }

    #[test]
    fn test_compose_error() {
        let s = Locale::En.strings();
        assert_eq!(
            s.compose_error("Failed: ", Some("timeout")),
            "Failed: timeout"
        );
        assert_eq!(s.compose_error("Failed: ", Some("  ")), "Failed: unknown error");
        assert_eq!(s.compose_error("Failed: ", None), "Failed: unknown error");
    }

    #[test]
    fn test_numbered() {
        assert_eq!(Strings::numbered(Locale::En.strings().image_header, 3), "Image 3");
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = Locale::Ja.format_timestamp(datetime!(2024-05-01 09:05 UTC));
        assert_eq!(ts.len(), 5);
        assert_eq!(&ts[2..3], ":");
        let ts = Locale::En.format_timestamp(datetime!(2024-05-01 21:05 UTC));
        assert!(ts.ends_with("AM") || ts.ends_with("PM"));
    }
}
