use crate::errors::ParseError;
use swc_common::sync::Lrc;
use swc_common::FileName;
use swc_common::FilePathMapping;
use swc_common::SourceMap;
use swc_common::Span;
use swc_common::Spanned;
use swc_ecma_ast::EsVersion;
use swc_ecma_ast::Script;
use swc_ecma_parser::error::Error;
use swc_ecma_parser::lexer::Lexer;
use swc_ecma_parser::EsSyntax;
use swc_ecma_parser::Parser;
use swc_ecma_parser::StringInput;
use swc_ecma_parser::Syntax;

/// A parsed program plus the source map that turns spans back into
/// line/column positions for the trace.
pub struct ParsedProgram {
    pub script: Script,
    pub source_map: Lrc<SourceMap>,
}

impl std::fmt::Debug for ParsedProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedProgram")
            .field("script", &self.script)
            .finish()
    }
}

impl ParsedProgram {
    /// 1-based source line for a node's span.
    pub fn line_of(&self, span: Span) -> u32 {
        line_col(&self.source_map, span).0
    }
}

/// Parses classic-script JavaScript source.
pub fn parse(source: &str) -> Result<ParsedProgram, ParseError> {
    let cm: Lrc<SourceMap> = Lrc::new(SourceMap::new(FilePathMapping::empty()));
    let fm = cm.new_source_file(FileName::Custom("main.js".into()).into(), source.to_string());

    // Initialize the JavaScript lexer.
    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        EsVersion::latest(),
        StringInput::from(&*fm),
        None,
    );

    let mut parser = Parser::new_from(lexer);

    let script = match parser.parse_script() {
        Ok(script) => script,
        Err(error) => return Err(to_parse_error(&cm, error)),
    };

    // The parser recovers from some syntax errors and stashes them instead
    // of failing; an educational tool should refuse those programs too.
    if let Some(error) = parser.take_errors().into_iter().next() {
        return Err(to_parse_error(&cm, error));
    }

    Ok(ParsedProgram {
        script,
        source_map: cm,
    })
}

/// 1-based line and 0-based display column for a span.
pub fn line_col(source_map: &SourceMap, span: Span) -> (u32, u32) {
    if span.lo.0 == 0 {
        // Dummy spans carry no position the source map can resolve.
        return (1, 0);
    }
    let loc = source_map.lookup_char_pos(span.lo);
    (loc.line as u32, loc.col_display as u32)
}

fn to_parse_error(source_map: &SourceMap, error: Error) -> ParseError {
    let (line, column) = line_col(source_map, error.span());
    ParseError {
        message: error.into_kind().msg().to_string(),
        line,
        column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_scripts() {
        let program = parse("let x = 1;\nconsole.log(x);").unwrap();
        assert_eq!(program.script.body.len(), 2);
    }

    #[test]
    fn surfaces_syntax_errors_with_positions() {
        let error = parse("let = ;").unwrap_err();
        assert_eq!(error.line, 1);
        assert!(!error.message.is_empty());
    }

    #[test]
    fn maps_spans_to_lines() {
        let program = parse("1;\n2;\n3;").unwrap();
        let last = program.script.body.last().unwrap();
        use swc_common::Spanned;
        assert_eq!(program.line_of(last.span()), 3);
    }
}
