macro_rules! assert_miette_contains {
    ($diag:expr, $expected:expr) => {{
        use miette::{GraphicalReportHandler, GraphicalTheme};

        let mut out = String::new();
        GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor())
            .with_width(200)
            .render_report(&mut out, &$diag.unwrap_err())
            .unwrap();
        assert!(
            out.contains($expected),
            "expected the report for `{}` to contain {:?}, but got:\n{out}",
            stringify!($diag),
            $expected
        );
    }};
}

pub(crate) use assert_miette_contains;
