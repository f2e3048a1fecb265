mod test_page;

pub use test_page::test_page;

// Shared CSS constant
pub const CSS: &str = r#"
    body {
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
        font-size: 14px;
    }

    .row {
        margin-bottom: 0.5rem;
    }

    #debug {
        font-family: 'SF Mono', Monaco, 'Cascadia Code', 'Roboto Mono', monospace;
        white-space: pre-wrap;
        word-wrap: break-word;
    }

    blockquote {
        margin: 0.25rem 0 0.25rem 1rem;
        color: #4b5563;
    }
"#;
