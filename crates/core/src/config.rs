use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub target: TargetConfig,
    pub webdriver: WebdriverConfig,
    pub mailbox: MailboxConfig,
    pub timeouts: TimeoutConfig,
    pub retries: RetryConfig,
    pub side_calls: SideCallConfig,
    pub keywords: KeywordConfig,
    pub verification: VerificationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TargetConfig {
    pub site_url: String,
    /// Substring of the login iframe's src attribute.
    pub login_iframe_hint: String,
    pub login_button_selector: String,
    pub email_input_selector: String,
    /// Optional "use a different account" prompt; absence is not an error.
    pub other_account_xpath: Option<String>,
    pub default_password: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            site_url: "https://chayns.net/72975-29241".to_string(),
            login_iframe_hint: "login.chayns.net".to_string(),
            login_button_selector: "button.beta-chayns-button".to_string(),
            email_input_selector: "input[name=\"email-phone\"]".to_string(),
            other_account_xpath: Some(
                "/html/body/div[1]/div/div[1]/div/div[2]/div[2]/div/div/div[2]".to_string(),
            ),
            default_password: "12345Abc".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebdriverConfig {
    pub url: String,
    pub headless: bool,
    pub window_size: String,
    pub user_agent: String,
    pub screenshot_on_failure: bool,
}

impl Default for WebdriverConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9515".to_string(),
            headless: true,
            window_size: "1920,1080".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            screenshot_on_failure: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MailboxConfig {
    pub base_url: String,
    pub domain: String,
    pub http_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub poll_max_attempts: u32,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.duckmail.sbs".to_string(),
            domain: "duckmail.sbs".to_string(),
            http_timeout_secs: 30,
            poll_interval_secs: 3,
            poll_max_attempts: 40,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-run ceiling, checked between steps.
    pub global_secs: u64,
    pub page_wait_secs: u64,
    pub element_wait_secs: u64,
    pub cookie_wait_secs: u64,
    /// Pause after clicks and navigations so the UI can settle.
    pub settle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            global_secs: 180,
            page_wait_secs: 20,
            element_wait_secs: 15,
            cookie_wait_secs: 30,
            settle_secs: 2,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub branch_attempts: u32,
    pub branch_delay_secs: u64,
    pub name_input_attempts: u32,
    pub name_input_delay_secs: u64,
    pub register_click_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            branch_attempts: 10,
            branch_delay_secs: 1,
            name_input_attempts: 10,
            name_input_delay_secs: 2,
            register_click_attempts: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SideCallConfig {
    /// Empty string disables the call.
    pub webhook_url: String,
    pub webhook_message: String,
    pub webhook_ner_mode: String,
    pub webhook_site_id: String,
    /// `{personId}` is replaced with the person id. Empty string disables the call.
    pub pro_access_url_template: String,
    /// Backend sync allowance before the pro-access lookup, not a readiness check.
    pub pro_access_sync_delay_secs: u64,
    pub http_timeout_secs: u64,
}

impl Default for SideCallConfig {
    fn default() -> Self {
        Self {
            webhook_url: "https://cube.tobit.cloud/chayns-ai-chatbot/intercom/cascading"
                .to_string(),
            webhook_message: "sidekick pro".to_string(),
            webhook_ner_mode: "None".to_string(),
            webhook_site_id: "95247-09669".to_string(),
            pro_access_url_template:
                "https://cube.tobit.cloud/ai-proxy/v1/userSettings/personId/{personId}".to_string(),
            pro_access_sync_delay_secs: 3,
            http_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KeywordConfig {
    pub login_buttons: Vec<String>,
    pub create_account: Vec<String>,
    pub continue_buttons: Vec<String>,
    pub register_buttons: Vec<String>,
    pub register_exclude: Vec<String>,
    pub set_password_buttons: Vec<String>,
    pub password_fields: Vec<String>,
    pub first_name: Vec<String>,
    pub last_name: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            login_buttons: strings(&[
                "Anmelden", "anmelden", "login", "sign in", "einloggen", "starten",
            ]),
            create_account: strings(&[
                "create account",
                "konto erstellen",
                "registrieren",
                "register",
                "sign up",
            ]),
            continue_buttons: strings(&[
                "weiter",
                "continue",
                "next",
                "fortfahren",
                "registrieren",
                "register",
            ]),
            register_buttons: strings(&["registrieren", "register", "sign up"]),
            register_exclude: strings(&["zurück", "back"]),
            set_password_buttons: strings(&[
                "set password",
                "passwort festlegen",
                "passwort setzen",
                "password",
            ]),
            password_fields: strings(&["password", "passwort", "kennwort"]),
            first_name: strings(&["first", "vorname", "given", "forename", "froename"]),
            last_name: strings(&["last", "nachname", "family", "surname", "surame"]),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VerificationConfig {
    /// Sender addresses that always identify the verification mail.
    pub senders: Vec<String>,
    /// Case-insensitive subject regexes, tried when the sender is unknown.
    pub subject_patterns: Vec<String>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            senders: strings(&["noreply@chayns.de", "no-reply@chayns.de"]),
            subject_patterns: strings(&[
                "Welcome to chayns",
                "verify",
                "activate",
                "confirm",
                "Willkommen",
                "bestätigen",
            ]),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_production_surface() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.target.site_url, "https://chayns.net/72975-29241");
        assert_eq!(cfg.mailbox.domain, "duckmail.sbs");
        assert_eq!(cfg.timeouts.global_secs, 180);
        assert_eq!(cfg.mailbox.poll_max_attempts, 40);
        assert_eq!(cfg.target.default_password, "12345Abc");
        assert!(!cfg.keywords.login_buttons.is_empty());
        assert!(!cfg.verification.senders.is_empty());
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.timeouts.element_wait_secs, 15);
        assert_eq!(cfg.retries.branch_attempts, 10);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [timeouts]
            global_secs = 60

            [webdriver]
            headless = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.timeouts.global_secs, 60);
        assert_eq!(cfg.timeouts.page_wait_secs, 20);
        assert!(!cfg.webdriver.headless);
        assert_eq!(cfg.mailbox.poll_interval_secs, 3);
    }
}
