//! End-to-end engine behaviour over real loaders.

use std::fs;
use std::path::Path;

use layr_adapters::{EngineConfig, FsLoader, MemoryLoader, open};
use layr_core::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

// ── helpers ──────────────────────────────────────────────────────────────

fn write_template(dir: &Path, path: &str, content: &str) {
    let full = dir.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(full, content).unwrap();
}

fn template_dir(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for (path, content) in files {
        write_template(temp.path(), path, content);
    }
    temp
}

fn assert_contains_all(result: &str, parts: &[&str]) {
    for part in parts {
        assert!(result.contains(part), "expected {part:?} in {result:?}");
    }
}

fn loaded(loader: MemoryLoader) -> Engine {
    let mut engine = Engine::new(loader);
    engine.load_all().unwrap();
    engine
}

fn test_functions() -> FuncMap {
    let mut funcs = FuncMap::new();
    funcs
        .insert("upper", |args: &[Value]| {
            let s = args.first().and_then(Value::as_str).ok_or("upper expects a string")?;
            Ok(json!(s.to_uppercase()))
        })
        .insert("repeat", |args: &[Value]| match args {
            [Value::String(s), Value::Number(n)] => {
                let n = n.as_u64().ok_or("repeat count must be a non-negative integer")?;
                Ok(json!(format!("{s} ").repeat(n as usize)))
            }
            _ => Err("repeat expects a string and a count".to_string()),
        })
        .insert("formatName", |args: &[Value]| match args {
            [Value::String(first), Value::String(last)] => Ok(json!(format!("{first} {last}"))),
            _ => Err("formatName expects two strings".to_string()),
        })
        .insert("add", |args: &[Value]| match args {
            [a, b] => {
                let (a, b) = (a.as_i64().ok_or("add expects integers")?, b.as_i64().ok_or("add expects integers")?);
                Ok(json!(a + b))
            }
            _ => Err("add expects two integers".to_string()),
        });
    funcs
}

// ── rendering ────────────────────────────────────────────────────────────

#[test]
fn simple_template_renders_its_own_block() {
    let temp = template_dir(&[(
        "pages/simple.html",
        "{{block \"content\" .}}\n    <h1>{{.Title}}</h1>\n    <p>{{.Content}}</p>\n{{end}}",
    )]);
    let engine = open(temp.path()).unwrap();

    let result = engine
        .render("pages/simple.html", &json!({"Title": "Hello", "Content": "World"}))
        .unwrap();
    assert_contains_all(&result, &["<h1>Hello</h1>", "<p>World</p>"]);
}

#[test]
fn child_blocks_replace_layout_defaults() {
    let temp = template_dir(&[
        (
            "layouts/base.html",
            r#"<!DOCTYPE html>
<html>
<head><title>{{block "title" .}}Default Title{{end}}</title></head>
<body>{{block "content" .}}Default Content{{end}}</body>
</html>"#,
        ),
        (
            "pages/child.html",
            r#"
{{extend "layouts/base.html"}}
{{block "title" .}}{{.Title}}{{end}}
{{block "content" .}}
    <h1>{{.Title}}</h1>
    <div>{{.Content}}</div>
{{end}}
"#,
        ),
    ]);
    let engine = open(temp.path()).unwrap();

    let result = engine
        .render("pages/child.html", &json!({"Title": "Page Title", "Content": "Page Content"}))
        .unwrap();
    assert_contains_all(
        &result,
        &["<title>Page Title</title>", "<h1>Page Title</h1>", "<div>Page Content</div>"],
    );
    assert!(!result.contains("Default"));
}

#[test]
fn hi_ann_never_default() {
    let engine = loaded(
        MemoryLoader::new()
            .with("base.html", r#"{{block "content" .}}Default{{end}}"#)
            .with("child.html", r#"{{extend "base.html"}}{{define "content"}}Hi {{.Name}}{{end}}"#),
    );
    assert_eq!(engine.render("child.html", &json!({"Name": "Ann"})).unwrap(), "Hi Ann");
    assert_eq!(engine.render("base.html", &json!({"Name": "Ann"})).unwrap(), "Default");
}

#[test]
fn nested_blocks_override_at_any_depth() {
    let temp = template_dir(&[
        (
            "layouts/base.html",
            r#"<head>{{block "head" .}}<title>{{block "title" .}}Default Title{{end}}</title>{{block "meta" .}}<meta name="description" content="Default description">{{end}}{{end}}</head>
<body>{{block "body" .}}<main>{{block "content" .}}Default Content{{end}}</main><aside>{{block "sidebar" .}}Default Sidebar{{end}}</aside>{{end}}</body>"#,
        ),
        (
            "pages/nested.html",
            r#"{{extend "layouts/base.html"}}
{{define "title"}}{{.Title}}{{end}}
{{define "content"}}<h1>{{.Title}}</h1>{{block "subcontent" .}}<p>{{.Content}}</p>{{end}}{{end}}
{{define "sidebar"}}<nav>{{range .Menu}}<a href="{{.URL}}">{{.Text}}</a>{{end}}</nav>{{end}}"#,
        ),
    ]);
    let engine = open(temp.path()).unwrap();

    let data = json!({
        "Title": "Nested",
        "Content": "Body text",
        "Menu": [{"URL": "/", "Text": "Home"}, {"URL": "/docs", "Text": "Docs"}],
    });
    let result = engine.render("pages/nested.html", &data).unwrap();
    assert_contains_all(
        &result,
        &[
            "<title>Nested</title>",
            r#"<meta name="description" content="Default description">"#,
            "<h1>Nested</h1><p>Body text</p>",
            r#"<a href="/">Home</a><a href="/docs">Docs</a>"#,
        ],
    );
    assert!(!result.contains("Default Sidebar"));
    assert!(!result.contains("Default Content"));
}

#[test]
fn context_flows_through_with_range_and_nested_blocks() {
    let temp = template_dir(&[
        ("layouts/base.html", r#"{{block "content" .}}{{end}}"#),
        (
            "pages/context.html",
            r#"{{extend "layouts/base.html"}}
{{block "content" .}}
  {{with .User}}
    <h1>{{.Name}}</h1>
    {{block "user-details" .}}
      <p>Email: {{.Email}}</p>
      {{with .Profile}}<p>Bio: {{.Bio}}</p>{{end}}
    {{end}}
  {{end}}
  {{range .Items}}<div>{{.Name}}: {{.Value}}</div>{{end}}
{{end}}"#,
        ),
    ]);
    let engine = open(temp.path()).unwrap();

    let data = json!({
        "User": {"Name": "John Doe", "Email": "john@example.com", "Profile": {"Bio": "Test bio"}},
        "Items": [{"Name": "Item1", "Value": "Value1"}, {"Name": "Item2", "Value": "Value2"}],
    });
    let result = engine.render("pages/context.html", &data).unwrap();
    assert_contains_all(
        &result,
        &[
            "<h1>John Doe</h1>",
            "<p>Email: john@example.com</p>",
            "<p>Bio: Test bio</p>",
            "<div>Item1: Value1</div>",
            "<div>Item2: Value2</div>",
        ],
    );
}

#[test]
fn three_level_chain_resolves_to_leaf_definition() {
    let engine = loaded(
        MemoryLoader::new()
            .with("c.html", r#"<{{block "x" .}}C{{end}}>"#)
            .with("b.html", r#"{{extend "c.html"}}{{define "x"}}B{{end}}"#)
            .with("a.html", r#"{{extend "b.html"}}{{define "x"}}A{{end}}"#),
    );
    assert_eq!(engine.render("a.html", &json!({})).unwrap(), "<A>");
    assert_eq!(engine.render("b.html", &json!({})).unwrap(), "<B>");
    assert_eq!(engine.render("c.html", &json!({})).unwrap(), "<C>");
}

#[test]
fn template_without_extend_renders_its_expanded_content() {
    let engine = loaded(
        MemoryLoader::new()
            .with("frag.html", "[frag {{.X}}]")
            .with("plain.html", r#"before {{include "frag.html" .}} after"#),
    );
    let resolved = engine.lookup("plain.html").unwrap();
    assert_eq!(resolved.parent(), None);
    assert_eq!(resolved.template().root().to_string(), "before [frag {{.X}}] after");
    assert_eq!(engine.render("plain.html", &json!({"X": 1})).unwrap(), "before [frag 1] after");
}

// ── includes ─────────────────────────────────────────────────────────────

#[test]
fn layout_includes_header_and_footer() {
    let temp = template_dir(&[
        (
            "partials/header.html",
            r#"<header><h1>{{.Title}}</h1><nav>{{range .NavItems}}<a href="{{.URL}}">{{.Name}}</a>{{end}}</nav></header>"#,
        ),
        ("partials/footer.html", "<footer><p>Copyright © {{.Year}} {{.Company}}</p></footer>"),
        (
            "layouts/base.html",
            r#"<!DOCTYPE html>
<html><head><title>{{.Title}}</title></head>
<body>
{{include "partials/header.html" .}}
{{block "content" .}}{{end}}
{{include "partials/footer.html" .}}
</body></html>"#,
        ),
        (
            "pages/home.html",
            r#"{{extend "layouts/base.html"}}
{{block "content" .}}<main><h2>Welcome to {{.Title}}</h2><div>{{.Content}}</div></main>{{end}}"#,
        ),
    ]);
    let engine = open(temp.path()).unwrap();

    let data = json!({
        "Title": "My Website",
        "NavItems": [
            {"Name": "Home", "URL": "/"},
            {"Name": "About", "URL": "/about"},
            {"Name": "Contact", "URL": "/contact"},
        ],
        "Content": "Welcome to our site!",
        "Year": "2024",
        "Company": "Example Corp",
    });
    let result = engine.render("pages/home.html", &data).unwrap();
    assert_contains_all(
        &result,
        &[
            "<!DOCTYPE html>",
            "<title>My Website</title>",
            "<header>",
            "<h1>My Website</h1>",
            r#"<a href="/">Home</a>"#,
            r#"<a href="/about">About</a>"#,
            r#"<a href="/contact">Contact</a>"#,
            "<h2>Welcome to My Website</h2>",
            "<div>Welcome to our site!</div>",
            "<footer>",
            "<p>Copyright © 2024 Example Corp</p>",
        ],
    );
}

#[test]
fn nested_includes_expand_recursively() {
    let engine = loaded(
        MemoryLoader::new()
            .with("partials/nav.html", r#"<nav>{{range .NavItems}}<a href="{{.URL}}">{{.Name}}</a>{{end}}</nav>"#)
            .with(
                "partials/header_with_nav.html",
                r#"<header><h1>{{.Title}}</h1>{{include "partials/nav.html" .}}</header>"#,
            )
            .with(
                "pages/nested_includes.html",
                r#"{{include "partials/header_with_nav.html" .}}<main>{{.Content}}</main>"#,
            ),
    );
    let data = json!({
        "Title": "My Website",
        "NavItems": [{"Name": "Home", "URL": "/"}, {"Name": "About", "URL": "/about"}],
        "Content": "Welcome to our site!",
    });
    let result = engine.render("pages/nested_includes.html", &data).unwrap();
    assert_eq!(
        result,
        r#"<header><h1>My Website</h1><nav><a href="/">Home</a><a href="/about">About</a></nav></header><main>Welcome to our site!</main>"#
    );
}

#[test]
fn missing_include_fails_the_load() {
    let temp = template_dir(&[(
        "pages/bad_include.html",
        r#"{{include "partials/nonexistent.html" .}}"#,
    )]);
    let err = open(temp.path()).unwrap_err();
    assert!(matches!(
        err,
        LayrError::NotFound { ref name, referenced_by: Some(ref by), .. }
            if name == "partials/nonexistent.html" && by == "pages/bad_include.html"
    ));
}

#[test]
fn template_added_after_load_is_not_found_until_reload() {
    let temp = template_dir(&[("index.html", "home")]);
    let mut engine = open(temp.path()).unwrap();

    write_template(temp.path(), "pages/late.html", "late");
    assert!(matches!(
        engine.render("pages/late.html", &json!({})),
        Err(LayrError::NotFound { .. })
    ));

    engine.reload().unwrap();
    assert_eq!(engine.render("pages/late.html", &json!({})).unwrap(), "late");
}

#[test]
fn include_read_once_even_when_used_twice() {
    let loader = MemoryLoader::new()
        .with("item.html", "<li>{{.}}</li>")
        .with("list.html", r#"<ul>{{include "item.html" .}}{{include "item.html" .}}</ul>"#);
    let counter = loader.clone();
    let engine = loaded(loader);

    assert_eq!(engine.render("list.html", "x").unwrap(), "<ul><li>x</li><li>x</li></ul>");
    assert_eq!(counter.read_count("item.html"), 1);
    assert_eq!(counter.read_count("list.html"), 1);
}

#[test]
fn every_source_is_read_once_per_load() {
    let loader = MemoryLoader::new()
        .with("base.html", r#"{{include "nav.html"}}{{block "body" .}}{{end}}"#)
        .with("nav.html", "<nav/>")
        .with("a.html", r#"{{extend "base.html"}}{{define "body"}}a{{end}}"#)
        .with("b.html", r#"{{extend "base.html"}}{{define "body"}}b{{end}}"#);
    let counter = loader.clone();
    let mut engine = Engine::new(loader);

    engine.load_all().unwrap();
    engine.load_all().unwrap();
    for name in ["base.html", "nav.html", "a.html", "b.html"] {
        assert_eq!(counter.read_count(name), 1, "{name}");
    }

    engine.reload().unwrap();
    assert_eq!(counter.read_count("base.html"), 2);
}

#[test]
fn diamond_includes_are_not_cycles() {
    let engine = loaded(
        MemoryLoader::new()
            .with("shared.html", "*")
            .with("left.html", r#"L{{include "shared.html"}}"#)
            .with("right.html", r#"R{{include "shared.html"}}"#)
            .with("page.html", r#"{{include "left.html"}}{{include "right.html"}}"#),
    );
    assert_eq!(engine.render("page.html", &json!({})).unwrap(), "L*R*");
}

#[test]
fn trim_markers_around_an_include_are_honoured() {
    let engine = loaded(
        MemoryLoader::new()
            .with("p.html", "A")
            .with("page.html", "x  {{- include \"p.html\" -}}  y"),
    );
    assert_eq!(engine.render("page.html", &json!({})).unwrap(), "xAy");
}

#[test]
fn fragment_declaring_a_define_works_inside_a_block() {
    let engine = loaded(
        MemoryLoader::new()
            .with("w.html", r#"{{define "x"}}X{{end}}w"#)
            .with("page.html", r#"{{block "content" .}}{{include "w.html"}}{{end}}|{{template "x"}}"#),
    );
    assert_eq!(engine.render("page.html", &json!({})).unwrap(), "w|X");
}

#[test]
fn include_cycle_fails_the_load() {
    let mut engine = Engine::new(
        MemoryLoader::new()
            .with("a.html", r#"{{include "b.html"}}"#)
            .with("b.html", r#"{{include "a.html"}}"#),
    );
    let err = engine.load_all().unwrap_err();
    assert_eq!(
        err,
        LayrError::Cycle {
            kind: CycleKind::Include,
            chain: vec!["a.html".into(), "b.html".into(), "a.html".into()],
        }
    );
    assert_eq!(engine.names().count(), 0);
}

// ── block visibility across includes ─────────────────────────────────────

#[test]
fn page_override_beats_block_carried_two_includes_deep() {
    let engine = loaded(
        MemoryLoader::new()
            .with("nav.html", r#"<nav>{{block "nav-extra" .}}default extra{{end}}</nav>"#)
            .with("partial.html", r#"<div>{{include "nav.html" .}}</div>"#)
            .with("layout.html", r#"<body>{{include "partial.html" .}}</body>"#)
            .with("page.html", r#"{{extend "layout.html"}}{{define "nav-extra"}}page extra{{end}}"#),
    );
    assert_eq!(
        engine.render("page.html", &json!({})).unwrap(),
        "<body><div><nav>page extra</nav></div></body>"
    );
    assert_eq!(
        engine.render("layout.html", &json!({})).unwrap(),
        "<body><div><nav>default extra</nav></div></body>"
    );
}

#[test]
fn block_carried_by_page_include_reaches_layout() {
    let engine = loaded(
        MemoryLoader::new()
            .with("nav.html", r#"{{define "nav-extra"}}from nav{{end}}"#)
            .with("partial.html", r#"{{include "nav.html"}}"#)
            .with("layout.html", r#"[{{block "nav-extra" .}}layout default{{end}}]"#)
            .with("page.html", r#"{{extend "layout.html"}}{{include "partial.html"}}"#),
    );
    assert_eq!(engine.render("page.html", &json!({})).unwrap(), "[from nav]");
}

#[test]
fn direct_definition_beats_same_level_include() {
    let engine = loaded(
        MemoryLoader::new()
            .with("widgets.html", r#"{{define "title"}}widget title{{end}}"#)
            .with("layout.html", r#"<h1>{{block "title" .}}layout{{end}}</h1>"#)
            .with(
                "page.html",
                r#"{{extend "layout.html"}}{{include "widgets.html"}}{{define "title"}}page title{{end}}"#,
            ),
    );
    assert_eq!(engine.render("page.html", &json!({})).unwrap(), "<h1>page title</h1>");
}

#[test]
fn including_a_child_template_is_a_configuration_error() {
    let mut engine = Engine::new(
        MemoryLoader::new()
            .with("base.html", "base")
            .with("child.html", r#"{{extend "base.html"}}"#)
            .with("page.html", r#"{{include "child.html"}}"#),
    );
    assert!(matches!(engine.load_all(), Err(LayrError::Configuration { .. })));
}

// ── failures ─────────────────────────────────────────────────────────────

#[test]
fn circular_inheritance_fails_the_load() {
    let temp = template_dir(&[
        ("pages/a.html", r#"{{extend "pages/b.html"}}{{block "content" .}}A content{{end}}"#),
        ("pages/b.html", r#"{{extend "pages/a.html"}}{{block "content" .}}B content{{end}}"#),
    ]);
    let err = open(temp.path()).unwrap_err();
    assert!(matches!(err, LayrError::Cycle { kind: CycleKind::Extends, .. }));
}

#[test]
fn invalid_syntax_fails_the_load_with_the_template_name() {
    let temp = template_dir(&[
        ("layouts/base.html", r#"{{block "content" .}}{{end}}"#),
        (
            "pages/invalid.html",
            "{{extend \"layouts/base.html\"}}\n{{block \"content\" .}}\n  {{.Unclosed}\n{{end}}",
        ),
    ]);
    let err = open(temp.path()).unwrap_err();
    assert!(matches!(err, LayrError::Syntax { ref name, .. } if name == "pages/invalid.html"));
}

#[test]
fn unregistered_name_is_not_found() {
    let temp = template_dir(&[]);
    let engine = open(temp.path()).unwrap();
    let err = engine.render("pages/nonexistent.html", &Value::Null).unwrap_err();
    assert!(matches!(err, LayrError::NotFound { .. }));
}

#[test]
fn render_error_does_not_affect_other_templates() {
    let engine = loaded(
        MemoryLoader::new()
            .with("bad.html", "{{.Name.First}}")
            .with("good.html", "ok"),
    );
    assert!(matches!(
        engine.render("bad.html", &json!({"Name": "plain"})),
        Err(LayrError::Runtime { .. })
    ));
    assert_eq!(engine.render("good.html", &json!({})).unwrap(), "ok");
    assert!(engine.render("bad.html", &json!({"Name": {"First": "Ann"}})).is_ok());
}

// ── functions ────────────────────────────────────────────────────────────

#[test]
fn registered_functions_are_callable() {
    let temp = template_dir(&[
        (
            "layouts/base.html",
            r#"<title>{{block "title" .}}Default Title{{end}}</title><body>{{block "content" .}}Default Content{{end}}</body>"#,
        ),
        (
            "pages/with_funcs.html",
            r#"{{extend "layouts/base.html"}}
{{block "content" .}}
<h1>{{upper .Title}}</h1>
<p>{{repeat "Hello" 3}}</p>
{{with .User}}<div>{{formatName .FirstName .LastName}}</div>{{end}}
<div>{{add 5 3}}</div>
{{end}}"#,
        ),
    ]);
    let mut engine = EngineConfig::new(temp.path())
        .builder()
        .functions(test_functions())
        .build()
        .unwrap();
    engine.load_all().unwrap();

    let data = json!({"Title": "My Page", "User": {"FirstName": "John", "LastName": "Doe"}});
    let result = engine.render("pages/with_funcs.html", &data).unwrap();
    assert_contains_all(
        &result,
        &["<h1>MY PAGE</h1>", "<p>Hello Hello Hello </p>", "<div>John Doe</div>", "<div>8</div>"],
    );
}

#[test]
fn memory_sources_with_functions() {
    let loader = MemoryLoader::new()
        .with(
            "layouts/base.html",
            r#"<title>{{block "title" .}}Default Title{{end}}</title>{{block "content" .}}Default Content{{end}}"#,
        )
        .with(
            "pages/home.html",
            r#"{{extend "layouts/base.html"}}{{block "content" .}}<h1>{{upper .Title}}</h1>{{end}}"#,
        );
    let mut engine = Engine::builder()
        .loader(loader)
        .functions(test_functions())
        .build()
        .unwrap();
    engine.load_all().unwrap();

    let result = engine.render("pages/home.html", &json!({"Title": "Test"})).unwrap();
    assert!(result.contains("<h1>TEST</h1>"), "{result}");
    assert!(result.contains("Default Title"), "{result}");
}

#[test]
fn add_functions_reloads_everything() {
    let loader = MemoryLoader::new().with("page.html", "{{upper .}}");
    let counter = loader.clone();
    let mut engine = Engine::new(loader);
    assert!(matches!(engine.load_all(), Err(LayrError::Syntax { .. })));

    engine.add_functions(test_functions()).unwrap();
    assert_eq!(engine.render("page.html", "quiet").unwrap(), "QUIET");
    assert_eq!(counter.read_count("page.html"), 2);
}

#[test]
fn fs_loader_and_memory_loader_agree() {
    let files = [
        ("base.html", r#"<{{block "b" .}}base{{end}}>"#),
        ("page.html", r#"{{extend "base.html"}}{{define "b"}}{{.}}{{end}}"#),
    ];
    let temp = template_dir(&files);
    let from_disk = {
        let mut engine = Engine::new(FsLoader::new(temp.path()));
        engine.load_all().unwrap();
        engine.render("page.html", "x").unwrap()
    };
    let from_memory = loaded(files.into_iter().collect()).render("page.html", "x").unwrap();
    assert_eq!(from_disk, from_memory);
    assert_eq!(from_disk, "<x>");
}

#[test]
fn concurrent_renders_share_one_engine() {
    let engine = std::sync::Arc::new(loaded(
        MemoryLoader::new()
            .with("base.html", r#"[{{block "x" .}}{{end}}]"#)
            .with("page.html", r#"{{extend "base.html"}}{{define "x"}}{{.}}{{end}}"#),
    ));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = std::sync::Arc::clone(&engine);
            std::thread::spawn(move || engine.render("page.html", &i).unwrap())
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), format!("[{i}]"));
    }
}
