use serde::{Deserialize, Serialize};

/// The CV designs on offer. All share one HTML layout and differ in theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvTemplate {
    #[default]
    Blue,
    Green,
    Purple,
    Red,
    Elegant,
    ClassicGrey,
}

/// Colours and type for one template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub accent: &'static str,
    pub heading: &'static str,
    pub text: &'static str,
    pub rule: &'static str,
    pub font_family: &'static str,
    /// Heading band behind the name.
    pub banner: bool,
}

const SANS: &str = "'Liberation Sans', Arial, Helvetica, sans-serif";
const SERIF: &str = "'Liberation Serif', Georgia, 'Times New Roman', serif";

impl CvTemplate {
    pub const ALL: [CvTemplate; 6] = [
        CvTemplate::Blue,
        CvTemplate::Green,
        CvTemplate::Purple,
        CvTemplate::Red,
        CvTemplate::Elegant,
        CvTemplate::ClassicGrey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CvTemplate::Blue => "blue",
            CvTemplate::Green => "green",
            CvTemplate::Purple => "purple",
            CvTemplate::Red => "red",
            CvTemplate::Elegant => "elegant",
            CvTemplate::ClassicGrey => "classic_grey",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CvTemplate::Blue => "Blue",
            CvTemplate::Green => "Green",
            CvTemplate::Purple => "Purple",
            CvTemplate::Red => "Red",
            CvTemplate::Elegant => "Elegant",
            CvTemplate::ClassicGrey => "Classic Grey",
        }
    }

    pub fn theme(&self) -> Theme {
        let colour = |accent, heading, rule| Theme {
            accent,
            heading,
            text: "#222222",
            rule,
            font_family: SANS,
            banner: true,
        };
        match self {
            CvTemplate::Blue => colour("#1f4e79", "#1f4e79", "#9dc3e6"),
            CvTemplate::Green => colour("#2e6b3f", "#2e6b3f", "#a9d18e"),
            CvTemplate::Purple => colour("#5b2c83", "#5b2c83", "#c9b3e0"),
            CvTemplate::Red => colour("#9c1c1c", "#9c1c1c", "#f4b6b6"),
            CvTemplate::Elegant => Theme {
                accent: "#3a3a3a",
                heading: "#7a5c2e",
                text: "#2b2b2b",
                rule: "#c8b48a",
                font_family: SERIF,
                banner: false,
            },
            CvTemplate::ClassicGrey => Theme {
                accent: "#4d4d4d",
                heading: "#4d4d4d",
                text: "#1a1a1a",
                rule: "#bfbfbf",
                font_family: SANS,
                banner: false,
            },
        }
    }
}
