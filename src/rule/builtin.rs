//! 内置技术签名
//! 权重约定：专有全局变量 / 专有资源路径 90+，通用目录特征 60-80，弱特征 40 以下

use super::signature::{PatternDef, SignalSource, SignatureDef};

use SignalSource::{Header, Html, InlineScript, MetaGenerator, ScriptSrc};

const fn p(source: SignalSource, pattern: &'static str, weight: u8) -> PatternDef {
    PatternDef {
        source,
        pattern,
        weight,
        version: None,
    }
}

const fn pv(
    source: SignalSource,
    pattern: &'static str,
    weight: u8,
    version: &'static str,
) -> PatternDef {
    PatternDef {
        source,
        pattern,
        weight,
        version: Some(version),
    }
}

pub static BUILTIN_SIGNATURES: &[SignatureDef] = &[
    // ===================== JavaScript 框架 =====================
    SignatureDef {
        name: "React",
        category: "JavaScript frameworks",
        implies: &[],
        patterns: &[
            p(ScriptSrc, r"react(?:-dom)?(?:\.production)?(?:\.min)?\.js", 90),
            pv(ScriptSrc, r"/react(?:-dom)?@(\d+(?:\.\d+)+)", 95, r"\1"),
            p(Html, r"data-reactroot", 80),
            p(InlineScript, r"__REACT_DEVTOOLS_GLOBAL_HOOK__|React\.createElement", 70),
        ],
    },
    SignatureDef {
        name: "Next.js",
        category: "JavaScript frameworks",
        implies: &["React", "Node.js"],
        patterns: &[
            p(ScriptSrc, r"/_next/static/", 95),
            p(Html, r#"id="__next_data__""#, 95),
            p(Header("x-powered-by"), r"^Next\.js", 90),
        ],
    },
    SignatureDef {
        name: "Vue.js",
        category: "JavaScript frameworks",
        implies: &[],
        patterns: &[
            p(ScriptSrc, r"vue(?:\.runtime)?(?:\.global)?(?:\.prod)?(?:\.min)?\.js", 90),
            pv(ScriptSrc, r"/vue@(\d+(?:\.\d+)+)", 95, r"\1"),
            p(Html, r"\sdata-v-[0-9a-f]{8}", 80),
            p(InlineScript, r"__VUE__|new Vue\(", 70),
        ],
    },
    SignatureDef {
        name: "Nuxt.js",
        category: "JavaScript frameworks",
        implies: &["Vue.js", "Node.js"],
        patterns: &[
            p(ScriptSrc, r"/_nuxt/", 95),
            p(InlineScript, r"window\.__NUXT__", 95),
            p(Html, r#"id="__nuxt""#, 80),
        ],
    },
    SignatureDef {
        name: "Angular",
        category: "JavaScript frameworks",
        implies: &["TypeScript"],
        patterns: &[
            pv(Html, r#"ng-version="(\d+(?:\.\d+)+)""#, 95, r"\1"),
            p(Html, r"<app-root", 60),
        ],
    },
    SignatureDef {
        name: "AngularJS",
        category: "JavaScript frameworks",
        implies: &[],
        patterns: &[
            pv(ScriptSrc, r"angular(?:js)?[/.-](\d+(?:\.\d+)+)?(?:/angular)?(?:\.min)?\.js", 90, r"\1"),
            p(Html, r"\sng-app(?:=|\s|>)", 85),
        ],
    },
    SignatureDef {
        name: "Svelte",
        category: "JavaScript frameworks",
        implies: &[],
        patterns: &[p(Html, r#"class="[^"]*\bsvelte-[a-z0-9]{5,}"#, 80)],
    },
    SignatureDef {
        name: "Gatsby",
        category: "Static site generator",
        implies: &["React"],
        patterns: &[
            p(Html, r#"id="___gatsby""#, 95),
            pv(MetaGenerator, r"^Gatsby(?: ([\d.]+))?", 95, r"\1"),
        ],
    },
    SignatureDef {
        name: "Hugo",
        category: "Static site generator",
        implies: &[],
        patterns: &[pv(MetaGenerator, r"^Hugo ([\d.]+)", 95, r"\1")],
    },
    SignatureDef {
        name: "Jekyll",
        category: "Static site generator",
        implies: &["Ruby"],
        patterns: &[pv(MetaGenerator, r"^Jekyll(?: v([\d.]+))?", 95, r"\1")],
    },
    // ===================== JavaScript 库 =====================
    SignatureDef {
        name: "jQuery",
        category: "JavaScript libraries",
        implies: &[],
        patterns: &[
            pv(ScriptSrc, r"jquery[.-]?(\d+(?:\.\d+)+)?(?:\.min)?\.js", 90, r"\1"),
            pv(ScriptSrc, r"/jquery/(\d+(?:\.\d+)+)/", 90, r"\1"),
            p(InlineScript, r"jQuery\(|\$\(document\)\.ready", 50),
        ],
    },
    SignatureDef {
        name: "Lodash",
        category: "JavaScript libraries",
        implies: &[],
        patterns: &[pv(ScriptSrc, r"lodash(?:@|\.)?(\d+(?:\.\d+)+)?(?:\.min)?\.js", 85, r"\1")],
    },
    SignatureDef {
        name: "Alpine.js",
        category: "JavaScript frameworks",
        implies: &[],
        patterns: &[
            pv(ScriptSrc, r"alpinejs(?:@(\d+(?:\.\d+)+))?", 90, r"\1"),
            p(Html, r"\sx-data(?:=|\s|>)", 70),
        ],
    },
    SignatureDef {
        name: "htmx",
        category: "JavaScript libraries",
        implies: &[],
        patterns: &[
            pv(ScriptSrc, r"htmx(?:\.org@(\d+(?:\.\d+)+))?(?:\.min)?\.js", 90, r"\1"),
            p(Html, r"\shx-(?:get|post|swap)=", 80),
        ],
    },
    // ===================== UI 框架 =====================
    SignatureDef {
        name: "Bootstrap",
        category: "UI frameworks",
        implies: &[],
        patterns: &[
            pv(ScriptSrc, r"bootstrap(?:@(\d+(?:\.\d+)+))?[^\s]*?(?:\.bundle)?(?:\.min)?\.js", 90, r"\1"),
            pv(Html, r#"<link[^>]+?bootstrap(?:@(\d+(?:\.\d+)+))?[^>]*?\.css"#, 85, r"\1"),
            p(Html, r#"class="[^"]*\b(?:navbar-expand-(?:sm|md|lg|xl)|col-(?:sm|md|lg)-\d+)"#, 60),
        ],
    },
    SignatureDef {
        name: "Tailwind CSS",
        category: "UI frameworks",
        implies: &[],
        patterns: &[
            p(ScriptSrc, r"cdn\.tailwindcss\.com", 95),
            p(Html, r"<link[^>]+?tailwind[^>]*\.css", 85),
            p(
                Html,
                r#"class="[^"]*\b(?:(?:sm|md|lg|xl):)?(?:px|py|mx|my)-\d+\b[^"]*\b(?:text|bg)-(?:gray|slate|zinc|blue|red|green)-\d00\b"#,
                60,
            ),
        ],
    },
    SignatureDef {
        name: "Bulma",
        category: "UI frameworks",
        implies: &[],
        patterns: &[pv(Html, r"<link[^>]+?bulma(?:@(\d+(?:\.\d+)+))?[^>]*\.css", 90, r"\1")],
    },
    SignatureDef {
        name: "Font Awesome",
        category: "Font scripts",
        implies: &[],
        patterns: &[
            p(ScriptSrc, r"kit\.fontawesome\.com|fontawesome[^/]*\.js", 90),
            pv(Html, r"<link[^>]+?font-?awesome(?:/(\d+(?:\.\d+)+))?[^>]*\.css", 85, r"\1"),
        ],
    },
    SignatureDef {
        name: "Google Font API",
        category: "Font scripts",
        implies: &[],
        patterns: &[p(Html, r"fonts\.googleapis\.com/css", 90)],
    },
    // ===================== CMS / 电商 =====================
    SignatureDef {
        name: "WordPress",
        category: "CMS",
        implies: &["PHP", "MySQL"],
        patterns: &[
            pv(MetaGenerator, r"^WordPress(?: ([\d.]+))?", 95, r"\1"),
            p(Html, r"/wp-(?:content|includes)/", 80),
            p(ScriptSrc, r"/wp-(?:content|includes)/", 80),
            p(Header("link"), r"rel=.https://api\.w\.org/", 90),
        ],
    },
    SignatureDef {
        name: "Drupal",
        category: "CMS",
        implies: &["PHP"],
        patterns: &[
            pv(MetaGenerator, r"^Drupal(?: (\d+))?", 95, r"\1"),
            p(InlineScript, r"Drupal\.settings|drupalSettings", 85),
            p(Header("x-generator"), r"^Drupal", 95),
        ],
    },
    SignatureDef {
        name: "Joomla",
        category: "CMS",
        implies: &["PHP"],
        patterns: &[pv(MetaGenerator, r"^Joomla!(?: ([\d.]+))?", 95, r"\1")],
    },
    SignatureDef {
        name: "Ghost",
        category: "CMS",
        implies: &["Node.js"],
        patterns: &[pv(MetaGenerator, r"^Ghost(?: ([\d.]+))?", 95, r"\1")],
    },
    SignatureDef {
        name: "Wix",
        category: "CMS",
        implies: &[],
        patterns: &[
            p(MetaGenerator, r"^Wix\.com", 95),
            p(ScriptSrc, r"static\.parastorage\.com", 85),
            p(InlineScript, r"wixBiSession", 90),
        ],
    },
    SignatureDef {
        name: "Squarespace",
        category: "CMS",
        implies: &[],
        patterns: &[
            p(InlineScript, r"Static\.SQUARESPACE_CONTEXT", 95),
            p(ScriptSrc, r"static1?\.squarespace\.com", 85),
        ],
    },
    SignatureDef {
        name: "Shopify",
        category: "Ecommerce",
        implies: &[],
        patterns: &[
            p(ScriptSrc, r"cdn\.shopify\.com", 90),
            p(InlineScript, r"Shopify\.(?:theme|shop)", 95),
            p(Header("x-shopid"), r"\d+", 95),
        ],
    },
    SignatureDef {
        name: "WooCommerce",
        category: "Ecommerce",
        implies: &["WordPress"],
        patterns: &[
            p(ScriptSrc, r"/woocommerce/", 90),
            p(Html, r#"class="[^"]*\bwoocommerce\b"#, 80),
        ],
    },
    // ===================== 统计 / 标签管理 =====================
    SignatureDef {
        name: "Google Analytics",
        category: "Analytics",
        implies: &[],
        patterns: &[
            p(ScriptSrc, r"google-analytics\.com/(?:ga|analytics)\.js", 95),
            p(ScriptSrc, r"googletagmanager\.com/gtag/js", 90),
            p(InlineScript, r"GoogleAnalyticsObject|gtag\(\s*'config'", 80),
        ],
    },
    SignatureDef {
        name: "Google Tag Manager",
        category: "Tag managers",
        implies: &[],
        patterns: &[
            p(ScriptSrc, r"googletagmanager\.com/gtm\.js", 95),
            p(InlineScript, r"googletagmanager\.com/gtm\.js|dataLayer\.push", 70),
        ],
    },
    SignatureDef {
        name: "Plausible",
        category: "Analytics",
        implies: &[],
        patterns: &[p(ScriptSrc, r"plausible\.io/js/", 95)],
    },
    SignatureDef {
        name: "Hotjar",
        category: "Analytics",
        implies: &[],
        patterns: &[
            p(ScriptSrc, r"static\.hotjar\.com", 95),
            p(InlineScript, r"_hjSettings", 90),
        ],
    },
    // ===================== 服务端 / 基础设施（响应头） =====================
    SignatureDef {
        name: "Nginx",
        category: "Web servers",
        implies: &[],
        patterns: &[pv(Header("server"), r"nginx(?:/([\d.]+))?", 95, r"\1")],
    },
    SignatureDef {
        name: "Apache HTTP Server",
        category: "Web servers",
        implies: &[],
        patterns: &[pv(Header("server"), r"apache(?:/([\d.]+))?", 95, r"\1")],
    },
    SignatureDef {
        name: "Cloudflare",
        category: "CDN",
        implies: &[],
        patterns: &[
            p(Header("server"), r"^cloudflare$", 95),
            p(Header("cf-ray"), r".+", 95),
            p(ScriptSrc, r"cdnjs\.cloudflare\.com", 30),
        ],
    },
    SignatureDef {
        name: "Vercel",
        category: "PaaS",
        implies: &[],
        patterns: &[
            p(Header("server"), r"^Vercel$", 95),
            p(Header("x-vercel-id"), r".+", 95),
        ],
    },
    SignatureDef {
        name: "Netlify",
        category: "PaaS",
        implies: &[],
        patterns: &[
            p(Header("server"), r"^Netlify$", 95),
            p(Header("x-nf-request-id"), r".+", 95),
        ],
    },
    SignatureDef {
        name: "Express",
        category: "Web frameworks",
        implies: &["Node.js"],
        patterns: &[p(Header("x-powered-by"), r"^Express$", 95)],
    },
    SignatureDef {
        name: "PHP",
        category: "Programming languages",
        implies: &[],
        patterns: &[pv(Header("x-powered-by"), r"^PHP(?:/([\d.]+))?", 95, r"\1")],
    },
    SignatureDef {
        name: "ASP.NET",
        category: "Web frameworks",
        implies: &[],
        patterns: &[
            p(Header("x-powered-by"), r"^ASP\.NET", 95),
            pv(Header("x-aspnet-version"), r"([\d.]+)", 95, r"\1"),
            p(Html, r#"name="__VIEWSTATE""#, 85),
        ],
    },
    // 仅由推断得出
    SignatureDef {
        name: "Node.js",
        category: "Programming languages",
        implies: &[],
        patterns: &[],
    },
    SignatureDef {
        name: "TypeScript",
        category: "Programming languages",
        implies: &[],
        patterns: &[],
    },
    SignatureDef {
        name: "Ruby",
        category: "Programming languages",
        implies: &[],
        patterns: &[],
    },
    SignatureDef {
        name: "MySQL",
        category: "Databases",
        implies: &[],
        patterns: &[],
    },
];
