//! `t.me` links for referrals, the Mini App and sharing.

use url::Url;

const TELEGRAM_ORIGIN: &str = "https://t.me";

/// Prefix of the `start` parameter carried by referral links.
pub const REFERRAL_PREFIX: &str = "ref_";

fn bot_url(bot: &str, path: &[&str]) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(TELEGRAM_ORIGIN)?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
        segments.clear();
        segments.push(bot.trim_start_matches('@'));
        segments.extend(path);
    }
    Ok(url)
}

/// `https://t.me/<bot>?start=ref_<user_id>`
pub fn referral_link(bot: &str, user_id: i64) -> Result<Url, url::ParseError> {
    let mut url = bot_url(bot, &[])?;
    url.query_pairs_mut()
        .append_pair("start", &format!("{REFERRAL_PREFIX}{user_id}"));
    Ok(url)
}

/// `https://t.me/<bot>/<app>?startapp=<param>`; the query is omitted when
/// `start_param` is `None`.
pub fn mini_app_link(
    bot: &str,
    app: &str,
    start_param: Option<&str>,
) -> Result<Url, url::ParseError> {
    let mut url = bot_url(bot, &[app])?;
    if let Some(param) = start_param {
        url.query_pairs_mut().append_pair("startapp", param);
    }
    Ok(url)
}

/// Telegram share sheet for `target` with a prefilled message.
pub fn share_link(target: &Url, text: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(TELEGRAM_ORIGIN)?.join("share/url")?;
    url.query_pairs_mut()
        .append_pair("url", target.as_str())
        .append_pair("text", text);
    Ok(url)
}

/// Referrer id encoded in a `start`/`start_param` value such as `ref_42`.
pub fn parse_referral(start_param: &str) -> Option<i64> {
    start_param
        .trim()
        .strip_prefix(REFERRAL_PREFIX)?
        .parse()
        .ok()
        .filter(|id: &i64| *id > 0)
}
