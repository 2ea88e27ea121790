use joko_core::RelativePath;
use serde::{Deserialize, Serialize};
use tracing::trace;
use xot::{Element, NameId, Xot};

/// ARGB packed color as authored in packs (`ffrrggbb`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const WHITE: Color = Color(0xFFFF_FFFF);

    /// Accepts `rrggbb` or `aarrggbb`, with or without a leading `#`.
    /// Six digits get an opaque alpha.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(hex, 16).ok()?;
        match hex.len() {
            6 => Some(Self(0xFF00_0000 | value)),
            8 => Some(Self(value)),
            _ => None,
        }
    }
    /// Red, green, blue, alpha in that order, the layout vertex colors use.
    pub fn to_rgba(self) -> [u8; 4] {
        let [a, r, g, b] = self.0.to_be_bytes();
        [r, g, b, a]
    }
}

/// Registered names of every xml tag and attribute the parser looks at.
/// Registering once per tree lets lookups compare ids instead of strings.
pub struct XotAttributeNameIDs {
    pub overlay_data: NameId,
    pub marker_category: NameId,
    pub pois: NameId,
    pub poi: NameId,
    pub trail: NameId,

    pub name: NameId,
    pub capital_display_name: NameId,
    pub display_name: NameId,
    pub default_toggle: NameId,
    pub map_id: NameId,
    pub xpos: NameId,
    pub ypos: NameId,
    pub zpos: NameId,
    pub category: NameId,
    pub guid: NameId,
    pub trail_data: NameId,
    pub capital_trail_data: NameId,

    pub icon_file: NameId,
    pub icon_file_dashed: NameId,
    pub icon_size: NameId,
    pub alpha: NameId,
    pub color: NameId,
    pub height_offset: NameId,
    pub fade_near: NameId,
    pub fade_far: NameId,
    pub min_size: NameId,
    pub max_size: NameId,
    pub behavior: NameId,
    pub trail_color: NameId,
    pub trail_scale: NameId,
    pub anim_speed: NameId,
    pub texture: NameId,
    pub trigger_range: NameId,
    pub reset_length: NameId,
    pub can_fade: NameId,
    pub auto_trigger: NameId,
}

impl XotAttributeNameIDs {
    pub fn register_with_xot(tree: &mut Xot) -> Self {
        Self {
            overlay_data: tree.add_name("OverlayData"),
            marker_category: tree.add_name("MarkerCategory"),
            pois: tree.add_name("POIs"),
            poi: tree.add_name("POI"),
            trail: tree.add_name("Trail"),

            name: tree.add_name("name"),
            capital_display_name: tree.add_name("DisplayName"),
            display_name: tree.add_name("displayName"),
            default_toggle: tree.add_name("defaulttoggle"),
            map_id: tree.add_name("MapID"),
            xpos: tree.add_name("xpos"),
            ypos: tree.add_name("ypos"),
            zpos: tree.add_name("zpos"),
            category: tree.add_name("type"),
            guid: tree.add_name("GUID"),
            trail_data: tree.add_name("trailData"),
            capital_trail_data: tree.add_name("TrailData"),

            icon_file: tree.add_name("iconFile"),
            icon_file_dashed: tree.add_name("icon-file"),
            icon_size: tree.add_name("iconSize"),
            alpha: tree.add_name("alpha"),
            color: tree.add_name("color"),
            height_offset: tree.add_name("heightOffset"),
            fade_near: tree.add_name("fadeNear"),
            fade_far: tree.add_name("fadeFar"),
            min_size: tree.add_name("minSize"),
            max_size: tree.add_name("maxSize"),
            behavior: tree.add_name("behavior"),
            trail_color: tree.add_name("trailColor"),
            trail_scale: tree.add_name("trailScale"),
            anim_speed: tree.add_name("animSpeedMult"),
            texture: tree.add_name("texture"),
            trigger_range: tree.add_name("triggerRange"),
            reset_length: tree.add_name("resetLength"),
            can_fade: tree.add_name("canFade"),
            auto_trigger: tree.add_name("autoTrigger"),
        }
    }
}

/// Declares the attribute record. Every field is an `Option`: `None` is "not authored here".
/// `values` fields also get an accessor falling back to the documented default.
macro_rules! common_attributes {
    (
        values { $( $vname:ident : $vty:ty = $vdefault:expr ),* $(,)? }
        paths { $( $pname:ident ),* $(,)? }
    ) => {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct CommonAttributes {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                $vname: Option<$vty>,
            )*
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                $pname: Option<RelativePath>,
            )*
        }

        paste::paste! {
            impl CommonAttributes {
                $(
                    pub fn [<get_ $vname>](&self) -> Option<&$vty> {
                        self.$vname.as_ref()
                    }
                    pub fn [<set_ $vname>](&mut self, value: Option<$vty>) {
                        self.$vname = value;
                    }
                    pub fn $vname(&self) -> $vty {
                        self.$vname.unwrap_or($vdefault)
                    }
                )*
                $(
                    pub fn [<get_ $pname>](&self) -> Option<&RelativePath> {
                        self.$pname.as_ref()
                    }
                    pub fn [<set_ $pname>](&mut self, value: Option<RelativePath>) {
                        self.$pname = value;
                    }
                )*

                /// Copies every field of `parent` that is not authored on `self`.
                pub fn inherit_if_attr_none(&mut self, parent: &CommonAttributes) {
                    $(
                        if self.$vname.is_none() {
                            self.$vname = parent.$vname;
                        }
                    )*
                    $(
                        if self.$pname.is_none() {
                            self.$pname.clone_from(&parent.$pname);
                        }
                    )*
                }

                pub fn is_empty(&self) -> bool {
                    true $( && self.$vname.is_none() )* $( && self.$pname.is_none() )*
                }
            }
        }
    };
}

common_attributes! {
    values {
        icon_size: f32 = 1.0,
        alpha: f32 = 1.0,
        color: Color = Color::WHITE,
        height_offset: f32 = 1.5,
        fade_near: f32 = -1.0,
        fade_far: f32 = -1.0,
        min_size: f32 = -1.0,
        max_size: f32 = -1.0,
        behavior: i32 = 0,
        trail_color: Color = Color::WHITE,
        trail_scale: f32 = 1.0,
        anim_speed: f32 = 1.0,
        trigger_range: f32 = 2.0,
        reset_length: i32 = 0,
        can_fade: bool = true,
        auto_trigger: bool = false,
    }
    paths {
        icon_file,
        texture,
    }
}

impl CommonAttributes {
    /// `child` with every unauthored field taken from `parent`.
    pub fn merge(child: &CommonAttributes, parent: &CommonAttributes) -> CommonAttributes {
        let mut merged = child.clone();
        merged.inherit_if_attr_none(parent);
        merged
    }

    /// Reads every known attribute present on `ele`.
    /// Values that fail to parse are ignored and leave the field as it was.
    pub fn update_common_attributes_from_element(
        &mut self,
        ele: &Element,
        names: &XotAttributeNameIDs,
    ) {
        if let Some(icon_file) = ele
            .get_attribute(names.icon_file)
            .or_else(|| ele.get_attribute(names.icon_file_dashed))
            .map(RelativePath::new)
            .filter(|p| !p.is_empty())
        {
            self.icon_file = Some(icon_file);
        }
        if let Some(texture) = ele
            .get_attribute(names.texture)
            .map(RelativePath::new)
            .filter(|p| !p.is_empty())
        {
            self.texture = Some(texture);
        }

        let float = |name: NameId| -> Option<f32> {
            let raw = ele.get_attribute(name)?;
            match raw.trim().parse::<f32>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => {
                    trace!(raw, "ignoring unparsable float attribute");
                    None
                }
            }
        };
        let int = |name: NameId| -> Option<i32> {
            let raw = ele.get_attribute(name)?;
            raw.trim().parse::<i32>().ok()
        };
        let color = |name: NameId| -> Option<Color> {
            let raw = ele.get_attribute(name)?;
            let parsed = Color::parse_hex(raw);
            if parsed.is_none() {
                trace!(raw, "ignoring unparsable color attribute");
            }
            parsed
        };
        let boolean = |name: NameId| -> Option<bool> {
            match ele.get_attribute(name)?.trim() {
                "1" | "true" | "True" => Some(true),
                "0" | "false" | "False" => Some(false),
                _ => None,
            }
        };

        macro_rules! read {
            ($field:ident, $reader:ident) => {
                if let Some(v) = $reader(names.$field) {
                    self.$field = Some(v);
                }
            };
        }
        read!(icon_size, float);
        read!(alpha, float);
        read!(color, color);
        read!(height_offset, float);
        read!(fade_near, float);
        read!(fade_far, float);
        read!(min_size, float);
        read!(max_size, float);
        read!(behavior, int);
        read!(trail_color, color);
        read!(trail_scale, float);
        read!(anim_speed, float);
        read!(trigger_range, float);
        read!(reset_length, int);
        read!(can_fade, boolean);
        read!(auto_trigger, boolean);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;
    use similar_asserts::assert_eq;

    fn sample() -> CommonAttributes {
        let mut attrs = CommonAttributes::default();
        attrs.set_icon_size(Some(2.0));
        attrs.set_fade_far(Some(800.0));
        attrs.set_color(Some(Color(0x80FF0000)));
        attrs.set_icon_file(Some(RelativePath::new("Icons/A.png")));
        attrs
    }

    #[test]
    fn merge_with_itself_is_identity() {
        let attrs = sample();
        assert_eq!(CommonAttributes::merge(&attrs, &attrs), attrs);
    }

    #[test]
    fn merge_with_unset_parent_is_identity() {
        let attrs = sample();
        assert_eq!(
            CommonAttributes::merge(&attrs, &CommonAttributes::default()),
            attrs
        );
    }

    #[test]
    fn child_wins_and_unset_fields_inherit() {
        let parent = sample();
        let mut child = CommonAttributes::default();
        child.set_icon_size(Some(0.5));
        // authoring the default value still counts as authored
        child.set_alpha(Some(1.0));
        let merged = CommonAttributes::merge(&child, &parent);
        assert_eq!(merged.icon_size(), 0.5);
        assert_eq!(merged.alpha(), 1.0);
        assert_eq!(merged.fade_far(), 800.0);
        assert_eq!(merged.get_icon_file().map(|p| p.as_str()), Some("icons/a.png"));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let attrs = CommonAttributes::default();
        assert!(attrs.is_empty());
        assert_eq!(attrs.height_offset(), 1.5);
        assert_eq!(attrs.trigger_range(), 2.0);
        assert_eq!(attrs.color(), Color::WHITE);
        assert!(attrs.can_fade());
        assert!(!attrs.auto_trigger());
    }

    #[rstest]
    #[case("ff0000", Some(0xFFFF0000))]
    #[case("#80ff0000", Some(0x80FF0000))]
    #[case("#FFFFFF", Some(0xFFFFFFFF))]
    #[case("fff", None)]
    #[case("+1234567", None)]
    #[case("zzzzzz", None)]
    fn parses_colors(#[case] raw: &str, #[case] expected: Option<u32>) {
        assert_eq!(Color::parse_hex(raw).map(|c| c.0), expected);
    }

    #[test]
    fn rgba_layout() {
        assert_eq!(Color(0x80112233).to_rgba(), [0x11, 0x22, 0x33, 0x80]);
    }

    #[test]
    fn reads_attributes_from_xml() {
        let mut tree = Xot::new();
        let names = XotAttributeNameIDs::register_with_xot(&mut tree);
        let root = tree
            .parse(r#"<POI icon-file="Data\Chest.png" iconSize="1.5" alpha="oops" color="00ff00" canFade="0" behavior="3"/>"#)
            .unwrap();
        let node = tree.document_element(root).unwrap();
        let ele = tree.element(node).unwrap();
        let mut attrs = CommonAttributes::default();
        attrs.update_common_attributes_from_element(ele, &names);
        assert_eq!(attrs.get_icon_file().map(|p| p.as_str()), Some("data/chest.png"));
        assert_eq!(attrs.get_icon_size(), Some(&1.5));
        assert_eq!(attrs.get_alpha(), None);
        assert_eq!(attrs.get_color(), Some(&Color(0xFF00FF00)));
        assert_eq!(attrs.get_can_fade(), Some(&false));
        assert_eq!(attrs.behavior(), 3);
    }
}
