use criterion::{black_box, criterion_group, criterion_main, Criterion};

use rh_core::{
    AppendMode, CookieModifier, CspModifier, Engine, EngineSettings, Filter, Header, HeaderModifier, Pattern,
    Profile, RequestContext, SetCookieModifier, UrlReplacement,
};

fn profiles() -> Vec<Profile> {
    vec![
        Profile {
            title: "api".to_string(),
            headers: vec![
                HeaderModifier::new("Authorization", "Bearer {{uuid}}"),
                HeaderModifier::new("Accept", "application/json").with_append_mode(AppendMode::CommaSeparatedAppend),
            ],
            cookie_headers: vec![CookieModifier::new("session.*", "{{existing_value}}-x", true)],
            filters: vec![Filter::Url(Pattern::new(r"^https://api\.example\.com/"))],
            ..Default::default()
        },
        Profile {
            title: "always".to_string(),
            resp_headers: vec![HeaderModifier::new("X-Frame-Options", "")],
            set_cookie_headers: vec![SetCookieModifier::new("tracking", "", false)],
            csp_headers: vec![CspModifier::new("frame-ancestors", "*")],
            url_replacements: vec![UrlReplacement::new(r"^http://(.*)$", "https://$1")],
            ..Default::default()
        },
    ]
}

fn bench_rewrite(c: &mut Criterion) {
    let engine = Engine::new(EngineSettings::default());
    let profiles = profiles();
    let request_headers = vec![
        Header::new("Accept", "text/html"),
        Header::new("Cookie", "session_id=abc; theme=dark; session_ttl=10"),
        Header::new("User-Agent", "bench"),
    ];
    let response_headers = vec![
        Header::new("Content-Type", "text/html"),
        Header::new("X-Frame-Options", "DENY"),
        Header::new("Set-Cookie", "tracking=1; Path=/"),
        Header::new("Content-Security-Policy", "default-src 'self'; frame-ancestors 'none'"),
    ];
    let ctx = RequestContext::for_url("https://api.example.com/v1/users")
        .with_request_headers(&request_headers)
        .with_response_headers(&response_headers);

    c.bench_function("modify_request_urls", |b| {
        b.iter(|| engine.modify_request_urls(black_box(&profiles), black_box(&ctx)))
    });
    c.bench_function("modify_request_headers", |b| {
        b.iter(|| engine.modify_request_headers(black_box(&profiles), black_box(&ctx)))
    });
    c.bench_function("modify_response_headers", |b| {
        b.iter(|| engine.modify_response_headers(black_box(&profiles), black_box(&ctx)))
    });
}

criterion_group!(benches, bench_rewrite);
criterion_main!(benches);
