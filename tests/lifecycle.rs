use browser_a11y::audit::Severity;
use browser_a11y::dom::ColorScheme;
use browser_a11y::rules::{self, BUILTIN_RULES};
use browser_a11y::{AuditConfig, AuditSession, Document, RunMode};

const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en" class="theme-light">
<head><title>Shop</title></head>
<body>
  <header>
    <nav>
      <a href="/" style="color: navy">Home</a>
      <a href="/pricing">Pricing</a>
      <img src="logo.png" alt="Shop">
    </nav>
  </header>
  <main>
    <h2>Welcome</h2>
    <h4 style="margin:0;outline:none">Deals</h4>
    <p lang="fr">Bonjour</p>
    <a href="/pricing/">See plans</a>
    <div onclick="buy()">Buy</div>
    <button tabindex="-1">Later</button>
  </main>
</body>
</html>"#;

fn session(config: AuditConfig) -> AuditSession {
    AuditSession::new(Document::from_html(PAGE), config).expect("builtin rules")
}

#[test]
fn test_apply_then_cleanup_restores_every_rule() {
    for id in BUILTIN_RULES {
        let mut session = session(AuditConfig::default());
        let before = session.document().to_html();

        let applied = session.run(id, RunMode::Apply).unwrap();
        assert!(applied.success, "{} should apply", id);

        let cleaned = session.run(id, RunMode::Cleanup).unwrap();
        assert!(cleaned.success, "{} should clean up", id);
        assert_eq!(session.document().to_html(), before, "{} left residue", id);
        assert_eq!(session.document().subscription_count(), 0);
    }
}

#[test]
fn test_all_rules_together_restore_document() {
    let mut session = session(AuditConfig::default());
    let before = session.document().to_html();

    assert!(session.apply_all().iter().all(|(_, outcome)| outcome.success));
    session.cleanup_all();

    assert_eq!(session.document().to_html(), before);
}

#[test]
fn test_cleanup_keeps_inline_background_image() {
    let html = r#"<html lang="en"><body><h2 style="background:url(data:image/png;base64,AAAA);color:red">Intro</h2></body></html>"#;
    let mut session = AuditSession::new(Document::from_html(html), AuditConfig::default()).unwrap();
    let before = session.document().to_html();

    assert!(session.select("heading-order").unwrap().success);
    let h2 = session.document().query_selector_all("h2").unwrap()[0];
    assert_eq!(
        session.document().style_property(h2, "background").as_deref(),
        Some("url(data:image/png;base64,AAAA)")
    );

    session.deselect("heading-order").unwrap();
    assert_eq!(session.document().to_html(), before);
    assert_eq!(
        session.document().attribute(h2, "style"),
        Some("background:url(data:image/png;base64,AAAA);color:red")
    );
}

#[test]
fn test_second_apply_is_rejected_and_changes_nothing() {
    let mut session = session(AuditConfig::default());

    assert!(session.run("heading-order", RunMode::Apply).unwrap().success);
    let annotated = session.document().to_html();

    let again = session.run("heading-order", RunMode::Apply).unwrap();
    assert!(!again.success);
    assert!(again.issues.is_none());
    assert_eq!(session.document().to_html(), annotated);
}

#[test]
fn test_heading_issues_on_sample_page() {
    let mut session = session(AuditConfig::default());
    let outcome = session.select("heading-order").unwrap();
    assert_eq!(outcome.issues.map(|i| i.len()), Some(2));

    let issues = session.issues();
    assert_eq!(issues[0].severity, Severity::Critical);
    assert_eq!(issues[0].evidence.expected.as_deref(), Some("h1"));
    assert_eq!(issues[0].location.element_type, "h2");
    assert_eq!(issues[1].severity, Severity::High);
    assert_eq!(issues[1].evidence.expected.as_deref(), Some("h3"));
    assert_eq!(issues[1].location.context, "in <main>");
}

#[test]
fn test_link_groups_on_sample_page() {
    let mut session = session(AuditConfig::default());
    session.select("link-label-consistency").unwrap();

    let issues = session.issues();
    assert_eq!(issues.len(), 2);
    assert!(issues.iter().all(|i| i.message.contains("/pricing")));
    assert!(issues.iter().all(|i| i.severity == Severity::Medium));
}

#[test]
fn test_issue_ids_are_deterministic() {
    let ids = |session: &mut AuditSession| {
        session.apply_all();
        let mut ids: Vec<String> = session.issues().into_iter().map(|i| i.issue_id).collect();
        ids.sort();
        session.cleanup_all();
        ids
    };

    let mut session = session(AuditConfig::default());
    let first = ids(&mut session);
    let second = ids(&mut session);
    assert!(!first.is_empty());
    assert_eq!(first, second);

    let mut fresh = self::session(AuditConfig::default());
    assert_eq!(ids(&mut fresh), first);
}

#[test]
fn test_revalidation_trigger_fidelity() {
    let mut session = session(AuditConfig::default());
    session.select("heading-order").unwrap();
    let main = session.document().query_selector_all("main").unwrap()[0];

    let note = session.document_mut().create_element("p");
    session.document_mut().append_child(main, note).unwrap();
    assert_eq!(session.dispatch().unwrap(), 0);

    let heading = session.document_mut().create_element("h1");
    let text = session.document_mut().create_text("Shop");
    session.document_mut().append_child(heading, text).unwrap();
    let first = session.document().children(main)[0];
    session.document_mut().insert_before(main, heading, Some(first)).unwrap();
    assert_eq!(session.dispatch().unwrap(), 1);

    // h1 now leads; h2 is fine and h4 still skips h3
    let issues = session.issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].location.element_type, "h4");
}

#[test]
fn test_root_theme_toggle_and_scheme_change_revalidate() {
    let mut session = session(AuditConfig::default());
    session.select("language-tag").unwrap();
    let root = session.document().document_element();

    session.document_mut().set_attribute(root, "class", "theme-dark").unwrap();
    assert_eq!(session.dispatch().unwrap(), 1);

    session.document_mut().set_color_scheme(ColorScheme::Dark);
    assert_eq!(session.dispatch().unwrap(), 1);

    let palette = session.config().palette(ColorScheme::Dark).clone();
    let outline = session.document().style_property(root, "outline").unwrap();
    assert!(outline.ends_with(&palette.pass));
}

#[test]
fn test_cleanup_after_revalidation_still_restores() {
    let mut session = session(AuditConfig::default());
    let before = session.document().to_html();

    session.select("heading-order").unwrap();
    session.document_mut().set_color_scheme(ColorScheme::Dark);
    session.dispatch().unwrap();
    session.document_mut().set_color_scheme(ColorScheme::Light);
    session.dispatch().unwrap();

    session.deselect("heading-order").unwrap();
    assert_eq!(session.document().to_html(), before);
}

#[test]
fn test_inactive_checker_ignores_changes() {
    let mut session = session(AuditConfig::default());
    session.select("heading-order").unwrap();
    session.deselect("heading-order").unwrap();

    let main = session.document().query_selector_all("main").unwrap()[0];
    let heading = session.document_mut().create_element("h1");
    session.document_mut().append_child(main, heading).unwrap();

    assert_eq!(session.dispatch().unwrap(), 0);
    assert!(session.active_rules().is_empty());
}

#[test]
fn test_restricted_config() {
    let config = AuditConfig::default().rules(["language-tag", "keyboard-reachability"]);
    let session = session(config.clone());
    assert_eq!(session.rule_ids(), vec!["keyboard-reachability", "language-tag"]);
    assert_eq!(rules::enabled_checkers(&config).unwrap().len(), 2);
}

#[test]
fn test_json_snapshot_document() {
    let json = r#"{
        "tag_name": "html",
        "attributes": {"lang": "en"},
        "children": [
            {"tag_name": "body", "children": [
                {"tag_name": "h1", "text_content": "Title"},
                {"tag_name": "div", "attributes": {"role": "button"},
                 "computed_style": {"cursor": "pointer"}, "text_content": "Go"}
            ]}
        ]
    }"#;
    let document = Document::from_json(json).unwrap();
    let mut session = AuditSession::new(document, AuditConfig::default()).unwrap();

    let outcome = session.select("interactive-cursor").unwrap();
    assert_eq!(outcome.issues, Some(vec![]));
}
