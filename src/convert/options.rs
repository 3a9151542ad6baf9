//! Client-supplied conversion options and their serialization into the
//! converter's argument vector.
//!
//! The mapping is purely mechanical: each field either emits a flag when
//! set (non-empty string / non-zero number / true) or stays silent. Zero
//! values mean "use the tool's default".

use serde::Deserialize;
use std::collections::BTreeMap;

pub type Metadata = BTreeMap<String, String>;
pub type Variables = BTreeMap<String, String>;
pub type RequestHeaders = BTreeMap<String, String>;

/// Flags configured on the service, forwarded into every invocation
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalFlags {
    pub verbose: bool,
    pub trace: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    pub from: String,
    pub to: String,
    pub data_dir: String,
    pub smart: bool,
    pub base_header_level: u32,
    pub strip_empty_paragraphs: bool,
    pub indented_code_classes: String,
    pub filter: String,
    pub lua_filter: String,
    pub preserve_tabs: bool,
    pub tab_stop: u32,
    /// accept|reject|all
    pub track_changes: String,
    pub file_scope: bool,
    pub extract_media: String,
    pub standalone: bool,
    pub template: String,
    pub metadata: Metadata,
    pub variable: Variables,
    pub request_header: RequestHeaders,
    pub dpi: u32,
    /// crlf|lf|native
    pub eol: String,
    /// auto|none|preserve
    pub wrap: String,
    pub columns: u32,
    pub strip_comments: bool,
    pub toc: bool,
    pub toc_depth: u32,
    pub no_highlight: bool,
    pub highlight_style: String,
    pub print_default_template: String,
    pub print_default_data_file: String,
    pub print_highlight_style: String,
    pub syntax_definition: String,
    pub include_in_header: String,
    pub include_before_body: String,
    pub include_after_body: String,
    pub resource_path: String,
    pub self_contained: bool,
    pub html_q_tags: bool,
    pub ascii: bool,
    pub reference_links: bool,
    /// block|section|document
    pub reference_location: String,
    pub atx_headers: bool,
    /// section|chapter|part
    pub top_level_division: String,
    pub number_sections: bool,
    pub number_offset: u32,
    pub listings: bool,
    pub incremental: bool,
    pub slide_level: u32,
    pub section_divs: bool,
    pub default_image_extension: String,
    /// none|javascript|references
    pub email_obfuscation: String,
    pub id_prefix: String,
    pub title_prefix: String,
    pub css: String,
    pub reference_doc: String,
    pub epub_subdirectory: String,
    pub epub_cover_image: String,
    pub epub_metadata: String,
    pub epub_embed_font: String,
    pub epub_chapter_level: u32,
    pub pdf_engine: String,
    pub pdf_engine_opt: String,
    pub bibliography: String,
    pub csl: String,
    pub citation_abbreviations: String,
    pub natbib: bool,
    pub biblatex: bool,
    pub mathml: bool,
    pub webtex: String,
    pub mathjax: String,
    pub latexmathml: String,
    pub mimetex: String,
    pub jsmath: String,
    pub gladtex: bool,
    pub katex: String,
    pub abbreviations: String,
    pub fail_if_warnings: bool,
}

impl ConvertOptions {
    /// Serialize into the converter's flag vector.
    pub fn to_args(&self, flags: GlobalFlags) -> Vec<String> {
        let mut args = ArgList::default();

        // The smart extension rides on the source format
        let from = if self.smart && !self.from.is_empty() {
            format!("{}+smart", self.from)
        } else {
            self.from.clone()
        };

        args.opt("--from", &from);
        // PDF output is selected by the output file extension, not --to
        if !self.to.eq_ignore_ascii_case("pdf") {
            args.opt("--to", &self.to);
        }
        args.opt("--data-dir", &self.data_dir);

        args.flag("--strip-empty-paragraphs", self.strip_empty_paragraphs);
        args.flag("--preserve-tabs", self.preserve_tabs);
        args.flag("--file-scope", self.file_scope);
        args.flag("--standalone", self.standalone);
        args.flag("--strip-comments", self.strip_comments);
        args.flag("--toc", self.toc);
        args.flag("--no-highlight", self.no_highlight);
        args.flag("--self-contained", self.self_contained);
        args.flag("--html-q-tags", self.html_q_tags);
        args.flag("--ascii", self.ascii);
        args.flag("--reference-links", self.reference_links);
        args.flag("--atx-headers", self.atx_headers);
        args.flag("--number-sections", self.number_sections);
        args.flag("--listings", self.listings);
        args.flag("--incremental", self.incremental);
        args.flag("--section-divs", self.section_divs);
        args.flag("--natbib", self.natbib);
        args.flag("--biblatex", self.biblatex);
        args.flag("--mathml", self.mathml);
        args.flag("--gladtex", self.gladtex);
        args.flag("--fail-if-warnings", self.fail_if_warnings);

        args.num("--base-header-level", self.base_header_level);
        args.num("--tab-stop", self.tab_stop);
        args.num("--dpi", self.dpi);
        args.num("--columns", self.columns);
        args.num("--toc-depth", self.toc_depth);
        args.num("--number-offset", self.number_offset);
        args.num("--slide-level", self.slide_level);
        args.num("--epub-chapter-level", self.epub_chapter_level);

        args.opt("--indented-code-classes", &self.indented_code_classes);
        args.opt("--filter", &self.filter);
        args.opt("--lua-filter", &self.lua_filter);
        args.opt("--track-changes", &self.track_changes);
        args.opt("--extract-media", &self.extract_media);
        args.opt("--template", &self.template);
        args.opt("--eol", &self.eol);
        args.opt("--wrap", &self.wrap);
        args.opt("--highlight-style", &self.highlight_style);
        args.opt("--print-default-template", &self.print_default_template);
        args.opt("--print-default-data-file", &self.print_default_data_file);
        args.opt("--print-highlight-style", &self.print_highlight_style);
        args.opt("--syntax-definition", &self.syntax_definition);
        args.opt("--include-in-header", &self.include_in_header);
        args.opt("--include-before-body", &self.include_before_body);
        args.opt("--include-after-body", &self.include_after_body);
        args.opt("--resource-path", &self.resource_path);
        args.opt("--reference-location", &self.reference_location);
        args.opt("--top-level-division", &self.top_level_division);
        args.opt("--default-image-extension", &self.default_image_extension);
        args.opt("--email-obfuscation", &self.email_obfuscation);
        args.opt("--id-prefix", &self.id_prefix);
        args.opt("--title-prefix", &self.title_prefix);
        args.opt("--css", &self.css);
        args.opt("--reference-doc", &self.reference_doc);
        args.opt("--epub-subdirectory", &self.epub_subdirectory);
        args.opt("--epub-cover-image", &self.epub_cover_image);
        args.opt("--epub-metadata", &self.epub_metadata);
        args.opt("--epub-embed-font", &self.epub_embed_font);
        args.opt("--pdf-engine-opt", &self.pdf_engine_opt);
        args.opt("--bibliography", &self.bibliography);
        args.opt("--csl", &self.csl);
        args.opt("--citation-abbreviations", &self.citation_abbreviations);
        args.opt("--webtex", &self.webtex);
        args.opt("--mathjax", &self.mathjax);
        args.opt("--latexmathml", &self.latexmathml);
        args.opt("--mimetex", &self.mimetex);
        args.opt("--jsmath", &self.jsmath);
        args.opt("--katex", &self.katex);
        args.opt("--abbreviations", &self.abbreviations);

        // PDF conversions need an engine even when the client named none
        let pdf_engine = if self.pdf_engine.is_empty() && self.to.eq_ignore_ascii_case("pdf")
        {
            "xelatex"
        } else {
            self.pdf_engine.as_str()
        };
        args.opt("--pdf-engine", pdf_engine);

        args.pairs("--variable", &self.variable);
        args.pairs("--metadata", &self.metadata);
        args.pairs("--request-header", &self.request_header);

        args.flag("--verbose", flags.verbose);
        args.flag("--trace", flags.trace);

        args.into_vec()
    }
}

#[derive(Default)]
struct ArgList(Vec<String>);

impl ArgList {
    fn flag(&mut self, name: &str, enabled: bool) {
        if enabled {
            self.0.push(name.to_string());
        }
    }

    fn opt(&mut self, name: &str, value: &str) {
        if !value.is_empty() {
            self.0.push(name.to_string());
            self.0.push(value.to_string());
        }
    }

    fn num(&mut self, name: &str, value: u32) {
        if value != 0 {
            self.0.push(name.to_string());
            self.0.push(value.to_string());
        }
    }

    fn pairs(&mut self, name: &str, values: &BTreeMap<String, String>) {
        for (key, value) in values {
            self.0.push(name.to_string());
            self.0.push(format!("{key}={value}"));
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(options: &ConvertOptions) -> Vec<String> {
        options.to_args(GlobalFlags::default())
    }

    #[test]
    fn test_empty_options_emit_nothing() {
        assert!(args_of(&ConvertOptions::default()).is_empty());
    }

    #[test]
    fn test_from_to_and_flags() {
        let options = ConvertOptions {
            from: "markdown".to_string(),
            to: "html".to_string(),
            standalone: true,
            toc: true,
            toc_depth: 2,
            ..Default::default()
        };

        let args = args_of(&options);
        assert_eq!(args[0..2], ["--from", "markdown"]);
        assert_eq!(args[2..4], ["--to", "html"]);
        assert!(args.contains(&"--standalone".to_string()));
        assert!(args.contains(&"--toc".to_string()));

        let i = args.iter().position(|a| a == "--toc-depth").unwrap();
        assert_eq!(args[i + 1], "2");
    }

    #[test]
    fn test_smart_extends_source_format() {
        let options = ConvertOptions {
            from: "markdown".to_string(),
            smart: true,
            ..Default::default()
        };

        assert_eq!(args_of(&options)[0..2], ["--from", "markdown+smart"]);
    }

    #[test]
    fn test_pdf_target_omits_to_and_defaults_engine() {
        let options = ConvertOptions {
            from: "markdown".to_string(),
            to: "PDF".to_string(),
            ..Default::default()
        };

        let args = args_of(&options);
        assert!(!args.contains(&"--to".to_string()));

        let i = args.iter().position(|a| a == "--pdf-engine").unwrap();
        assert_eq!(args[i + 1], "xelatex");
    }

    #[test]
    fn test_variables_and_metadata_pairs() {
        let mut options = ConvertOptions {
            from: "markdown".to_string(),
            to: "html".to_string(),
            ..Default::default()
        };
        options.variable.insert("lang".to_string(), "en".to_string());
        options
            .metadata
            .insert("title".to_string(), "Report".to_string());

        let args = args_of(&options);

        let i = args.iter().position(|a| a == "--variable").unwrap();
        assert_eq!(args[i + 1], "lang=en");

        let i = args.iter().position(|a| a == "--metadata").unwrap();
        assert_eq!(args[i + 1], "title=Report");
    }

    #[test]
    fn test_math_rendering_and_print_options() {
        let options = ConvertOptions {
            print_highlight_style: "pygments".to_string(),
            latexmathml: "LaTeXMathML.js".to_string(),
            mimetex: "/cgi-bin/mimetex.cgi".to_string(),
            gladtex: true,
            ..Default::default()
        };

        let args = args_of(&options);

        let i = args
            .iter()
            .position(|a| a == "--print-highlight-style")
            .unwrap();
        assert_eq!(args[i + 1], "pygments");

        let i = args.iter().position(|a| a == "--latexmathml").unwrap();
        assert_eq!(args[i + 1], "LaTeXMathML.js");

        let i = args.iter().position(|a| a == "--mimetex").unwrap();
        assert_eq!(args[i + 1], "/cgi-bin/mimetex.cgi");

        assert!(args.contains(&"--gladtex".to_string()));
    }

    #[test]
    fn test_global_flags_forwarded() {
        let options = ConvertOptions::default();
        let args = options.to_args(GlobalFlags {
            verbose: true,
            trace: true,
        });

        assert_eq!(args, ["--verbose", "--trace"]);
    }

    #[test]
    fn test_deserializes_from_request_json() {
        let options: ConvertOptions = serde_json::from_value(serde_json::json!({
            "from": "markdown",
            "to": "html",
            "standalone": true,
            "variable": {"lang": "en"}
        }))
        .unwrap();

        assert_eq!(options.from, "markdown");
        assert!(options.standalone);
        assert_eq!(options.variable["lang"], "en");
    }
}
