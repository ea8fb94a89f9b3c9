use std::path::PathBuf;
use std::time::Duration;

use carousel_showcase::config::Configuration;

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
site-title: "DAP Ocean Framework"
image-dir: "/srv/assets"
captions-path: "/srv/captions.json"
bind-address: "0.0.0.0:9000"
autoplay-poll: 25ms
carousels:
  - name: company
    prefix: empresa
    param: emp
    max-items: 3
    interval: 3s
    reset-timer-on-manual-nav: false
contact:
  recipient: "contato@dapsat.com"
  subject: "DAP Ocean Framework — Contact"
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.site_title, "DAP Ocean Framework");
    assert_eq!(cfg.image_dir, PathBuf::from("/srv/assets"));
    assert_eq!(cfg.bind_address.port(), 9000);
    assert_eq!(cfg.autoplay_poll, Duration::from_millis(25));

    let company = cfg.carousel("company").expect("company carousel");
    assert_eq!(company.param(), "emp");
    assert_eq!(company.max_items, 3);
    let settings = company.settings();
    assert_eq!(settings.interval, Duration::from_secs(3));
    assert!(!settings.reset_timer_on_manual_nav);
    assert_eq!(cfg.contact.subject, "DAP Ocean Framework — Contact");
}

#[test]
fn carousel_defaults_apply() {
    let yaml = r#"
carousels:
  - name: thumb
    prefix: thumb
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    let thumb = &cfg.carousels[0];
    assert_eq!(thumb.param(), "thumb");
    assert_eq!(thumb.max_items, 24);
    assert_eq!(thumb.interval, Duration::from_secs(3));
    assert!(thumb.reset_timer_on_manual_nav);
    assert_eq!(cfg.autoplay_poll, Duration::from_millis(50));
    assert_eq!(cfg.captions_path, PathBuf::from("captions.json"));
    assert_eq!(cfg.session_idle, Duration::from_secs(30 * 60));
    assert_eq!(cfg.max_sessions, 1024);
}

#[test]
fn rejects_zero_session_limits() {
    for top in ["session-idle: 0s\n", "max-sessions: 0\n"] {
        let yaml = format!("{top}carousels:\n  - name: hero\n    prefix: thumb\n");
        let cfg: Configuration = serde_yaml::from_str(&yaml).unwrap();
        assert!(cfg.validated().is_err(), "accepted: {top}");
    }
}

#[test]
fn rejects_missing_carousels() {
    let cfg: Configuration = serde_yaml::from_str("site-title: x\n").unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("at least one carousel"));
}

#[test]
fn rejects_duplicate_params() {
    let yaml = r#"
carousels:
  - name: hero
    prefix: thumb
    param: thumb
  - name: partners
    prefix: pthumb
    param: thumb
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("duplicate carousel param"));
}

#[test]
fn rejects_zero_interval_and_zero_max_items() {
    for body in [
        "    interval: 0s\n",
        "    max-items: 0\n",
    ] {
        let yaml = format!("carousels:\n  - name: hero\n    prefix: thumb\n{body}");
        let cfg: Configuration = serde_yaml::from_str(&yaml).unwrap();
        assert!(cfg.validated().is_err(), "accepted: {body}");
    }
}

#[test]
fn rejects_carousel_without_prefix_or_manifest() {
    let cfg: Configuration = serde_yaml::from_str("carousels:\n  - name: hero\n").unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn manifest_carousel_needs_no_prefix() {
    let yaml = r#"
carousels:
  - name: partners
    manifest: partners.json
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validated().is_ok());
}

#[test]
fn rejects_unsafe_carousel_names() {
    let cfg: Configuration =
        serde_yaml::from_str("carousels:\n  - name: \"a/b\"\n    prefix: x\n").unwrap();
    assert!(cfg.validated().is_err());
}
