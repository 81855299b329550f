use anyhow::{Result, Context};
use regex::Regex;

pub const TOKEN_NAME: &str = "__RequestVerificationToken";

/// Keeps the `name=value` part of each `Set-Cookie` header and joins them with `; `.
pub fn join_set_cookies<'a, I>(set_cookies: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    set_cookies
        .into_iter()
        .map(|cookie| cookie.split(';').next().unwrap_or("").trim())
        .filter(|pair| !pair.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Finds the verification token inside a joined cookie string.
pub fn token_from_cookies(cookies: &str) -> Option<String> {
    let segment = cookies
        .split(';')
        .find(|segment| segment.contains(TOKEN_NAME))?;

    let (_, value) = segment.split_once('=')?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

/// Pulls the token out of the hidden input on the login page.
pub fn token_from_body(html: &str) -> Result<Option<String>> {
    let re = Regex::new(r#"name="__RequestVerificationToken" type="hidden" value="([^"]*)""#)
        .context("unable to compile regex")?;

    let token = re
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str())
        .filter(|value| !value.is_empty())
        .map(str::to_owned);

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Markup served by the login page; if the server changes it this is the test that should break.
    const LOGIN_FORM_FIXTURE: &str = r#"<form action="/Login" method="post">
<input name="__RequestVerificationToken" type="hidden" value="XYZ" />
<input id="UserName" name="UserName" type="text" value="" />
</form>"#;

    #[test]
    fn join_set_cookies_test() {
        let headers = [
            "ASP.NET_SessionId=abc; path=/; HttpOnly",
            "__RequestVerificationToken=ABC123; Path=/; HttpOnly",
            "lang=en",
        ];
        assert_eq!(
            join_set_cookies(headers),
            "ASP.NET_SessionId=abc; __RequestVerificationToken=ABC123; lang=en"
        );
        assert_eq!(join_set_cookies(Vec::<&str>::new()), "");
        assert_eq!(join_set_cookies([" ; Path=/"]), "");
    }

    #[test]
    fn token_from_cookies_test() {
        let test_cases = [
            ("ASP.NET_SessionId=abc; __RequestVerificationToken=ABC123", Some("ABC123")),
            ("__RequestVerificationToken=ABC123", Some("ABC123")),
            ("__RequestVerificationToken_L2xvZ2lu=Zm9v==; a=b", Some("Zm9v==")),
            ("ASP.NET_SessionId=abc", None),
            ("__RequestVerificationToken=", None),
            ("__RequestVerificationToken", None),
            ("", None),
        ];
        for case in test_cases {
            assert_eq!(token_from_cookies(case.0).as_deref(), case.1, "cookies: {}", case.0);
        }
    }

    #[test]
    fn token_from_headers_test() {
        let headers = [
            "ASP.NET_SessionId=s3ss10n; path=/; HttpOnly",
            "__RequestVerificationToken=ABC123; Path=/; HttpOnly",
        ];
        let cookies = join_set_cookies(headers);
        assert!(cookies.contains("__RequestVerificationToken=ABC123"));
        assert_eq!(token_from_cookies(&cookies).as_deref(), Some("ABC123"));
    }

    #[test]
    fn token_from_body_test() {
        let test_cases = [
            (LOGIN_FORM_FIXTURE, Some("XYZ")),
            (r#"<input name="__RequestVerificationToken" type="hidden" value="" />"#, None),
            (r#"<input type="hidden" name="__RequestVerificationToken" value="XYZ" />"#, None),
            ("<html><body>maintenance</body></html>", None),
            ("", None),
        ];
        for case in test_cases {
            assert_eq!(token_from_body(case.0).unwrap().as_deref(), case.1);
        }
    }
}
