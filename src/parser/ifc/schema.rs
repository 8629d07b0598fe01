//! Read-only IFC lookup tables.

use super::value::ValueField;

/// Supported element entities: (type code, schema name, category).
///
/// Order is enumeration order; an entity reachable through several codes
/// is reported once, under the first code that yields it.
pub const SUPPORTED_ELEMENTS: &[(&str, &str, &str)] = &[
    ("IFCWALL", "IfcWall", "Walls"),
    ("IFCWALLSTANDARDCASE", "IfcWallStandardCase", "Walls"),
    ("IFCCURTAINWALL", "IfcCurtainWall", "Curtain Walls"),
    ("IFCDOOR", "IfcDoor", "Doors"),
    ("IFCWINDOW", "IfcWindow", "Windows"),
    ("IFCSLAB", "IfcSlab", "Slabs"),
    ("IFCROOF", "IfcRoof", "Roofs"),
    ("IFCCOLUMN", "IfcColumn", "Columns"),
    ("IFCBEAM", "IfcBeam", "Beams"),
    ("IFCMEMBER", "IfcMember", "Members"),
    ("IFCPLATE", "IfcPlate", "Plates"),
    ("IFCFOOTING", "IfcFooting", "Foundations"),
    ("IFCPILE", "IfcPile", "Foundations"),
    ("IFCSTAIR", "IfcStair", "Stairs"),
    ("IFCSTAIRFLIGHT", "IfcStairFlight", "Stairs"),
    ("IFCRAMP", "IfcRamp", "Ramps"),
    ("IFCRAILING", "IfcRailing", "Railings"),
    ("IFCCOVERING", "IfcCovering", "Coverings"),
    ("IFCFURNISHINGELEMENT", "IfcFurnishingElement", "Furniture"),
    ("IFCFURNITURE", "IfcFurniture", "Furniture"),
    ("IFCBUILDINGELEMENTPROXY", "IfcBuildingElementProxy", "Generic Models"),
    ("IFCSPACE", "IfcSpace", "Spaces"),
    ("IFCFLOWTERMINAL", "IfcFlowTerminal", "Fixtures"),
    ("IFCSANITARYTERMINAL", "IfcSanitaryTerminal", "Plumbing Fixtures"),
    ("IFCPIPESEGMENT", "IfcPipeSegment", "Pipes"),
    ("IFCPIPEFITTING", "IfcPipeFitting", "Pipe Fittings"),
    ("IFCDUCTSEGMENT", "IfcDuctSegment", "Ducts"),
    ("IFCDUCTFITTING", "IfcDuctFitting", "Duct Fittings"),
    ("IFCCABLECARRIERSEGMENT", "IfcCableCarrierSegment", "Cable Trays"),
    ("IFCFLOWSEGMENT", "IfcFlowSegment", "Flow Segments"),
    ("IFCFLOWFITTING", "IfcFlowFitting", "Flow Fittings"),
    ("IFCLIGHTFIXTURE", "IfcLightFixture", "Lighting Fixtures"),
    ("IFCDISTRIBUTIONELEMENT", "IfcDistributionElement", "Mechanical Equipment"),
];

/// Subtypes returned when enumerating a supertype code.
pub const SUBTYPES: &[(&str, &[&str])] = &[
    ("IFCWALL", &["IFCWALLSTANDARDCASE", "IFCWALLELEMENTEDCASE"]),
    ("IFCSLAB", &["IFCSLABSTANDARDCASE", "IFCSLABELEMENTEDCASE"]),
    ("IFCBEAM", &["IFCBEAMSTANDARDCASE"]),
    ("IFCCOLUMN", &["IFCCOLUMNSTANDARDCASE"]),
    ("IFCMEMBER", &["IFCMEMBERSTANDARDCASE"]),
    ("IFCPLATE", &["IFCPLATESTANDARDCASE"]),
    ("IFCDOOR", &["IFCDOORSTANDARDCASE"]),
    ("IFCWINDOW", &["IFCWINDOWSTANDARDCASE"]),
    ("IFCFLOWTERMINAL", &["IFCSANITARYTERMINAL", "IFCLIGHTFIXTURE"]),
    ("IFCFLOWSEGMENT", &["IFCPIPESEGMENT", "IFCDUCTSEGMENT", "IFCCABLECARRIERSEGMENT"]),
    ("IFCFLOWFITTING", &["IFCPIPEFITTING", "IFCDUCTFITTING"]),
];

/// Attribute position of `PredefinedType` where it is not the usual 8th
/// slot (IFC4 layout). `None` marks entities without one.
const PREDEFINED_TYPE_INDEX: &[(&str, Option<usize>)] = &[
    ("IFCDOOR", Some(10)),
    ("IFCDOORSTANDARDCASE", Some(10)),
    ("IFCWINDOW", Some(10)),
    ("IFCWINDOWSTANDARDCASE", Some(10)),
    ("IFCSPACE", Some(9)),
    ("IFCSTAIRFLIGHT", Some(12)),
    ("IFCFURNISHINGELEMENT", None),
    ("IFCFLOWTERMINAL", None),
    ("IFCFLOWSEGMENT", None),
    ("IFCFLOWFITTING", None),
    ("IFCDISTRIBUTIONELEMENT", None),
];

/// IFC2x3 entities whose IFC4 `PredefinedType` slot is absent or holds a
/// different attribute (`CompositionType`, `InteriorOrExteriorSpace`).
const IFC2X3_WITHOUT_PREDEFINED_TYPE: &[&str] = &[
    "IFCWALL",
    "IFCWALLSTANDARDCASE",
    "IFCCURTAINWALL",
    "IFCDOOR",
    "IFCWINDOW",
    "IFCCOLUMN",
    "IFCBEAM",
    "IFCMEMBER",
    "IFCPLATE",
    "IFCSTAIRFLIGHT",
    "IFCBUILDINGELEMENTPROXY",
    "IFCSPACE",
];

/// Spatial structure entity that scopes elements to a level.
pub const STOREY: &str = "IFCBUILDINGSTOREY";

/// Where a property or quantity item keeps its value fields and unit.
pub struct ItemLayout {
    pub type_code: &'static str,
    pub fields: &'static [(ValueField, usize)],
    pub unit: Option<usize>,
}

/// Property and quantity items the engine reads. The name is always the
/// first attribute.
pub const PROPERTY_ITEM_LAYOUTS: &[ItemLayout] = &[
    ItemLayout {
        type_code: "IFCPROPERTYSINGLEVALUE",
        fields: &[(ValueField::NominalValue, 2)],
        unit: Some(3),
    },
    ItemLayout {
        type_code: "IFCPROPERTYENUMERATEDVALUE",
        fields: &[(ValueField::Value, 2)],
        unit: None,
    },
    ItemLayout {
        type_code: "IFCPROPERTYLISTVALUE",
        fields: &[(ValueField::Value, 2)],
        unit: Some(3),
    },
    ItemLayout {
        type_code: "IFCPROPERTYBOUNDEDVALUE",
        fields: &[(ValueField::Value, 5)],
        unit: Some(4),
    },
    ItemLayout {
        type_code: "IFCQUANTITYLENGTH",
        fields: &[(ValueField::LengthValue, 3)],
        unit: Some(2),
    },
    ItemLayout {
        type_code: "IFCQUANTITYAREA",
        fields: &[(ValueField::AreaValue, 3)],
        unit: Some(2),
    },
    ItemLayout {
        type_code: "IFCQUANTITYVOLUME",
        fields: &[(ValueField::VolumeValue, 3)],
        unit: Some(2),
    },
    ItemLayout {
        type_code: "IFCQUANTITYCOUNT",
        fields: &[(ValueField::CountValue, 3)],
        unit: Some(2),
    },
    ItemLayout {
        type_code: "IFCQUANTITYWEIGHT",
        fields: &[(ValueField::WeightValue, 3)],
        unit: Some(2),
    },
    ItemLayout {
        type_code: "IFCQUANTITYTIME",
        fields: &[(ValueField::TimeValue, 3)],
        unit: Some(2),
    },
];

#[must_use]
pub fn item_layout(type_code: &str) -> Option<&'static ItemLayout> {
    PROPERTY_ITEM_LAYOUTS
        .iter()
        .find(|layout| layout.type_code == type_code)
}

/// Standard attribute positions shared by every `IfcProduct`.
pub mod attr {
    pub const GLOBAL_ID: usize = 0;
    pub const NAME: usize = 2;
    pub const DESCRIPTION: usize = 3;
    pub const OBJECT_TYPE: usize = 4;
    pub const OBJECT_PLACEMENT: usize = 5;
    pub const REPRESENTATION: usize = 6;
}

/// Category label for an entity type code.
#[must_use]
pub fn category_for(type_code: &str) -> Option<&'static str> {
    SUPPORTED_ELEMENTS
        .iter()
        .find(|(code, _, _)| *code == type_code)
        .map(|(_, _, category)| *category)
        .or_else(|| {
            SUBTYPES
                .iter()
                .find(|(_, subtypes)| subtypes.contains(&type_code))
                .and_then(|(parent, _)| category_for(parent))
        })
}

/// Schema spelling of a type code. Unlisted subtypes take their parent's
/// spelling; anything else falls back to the code itself.
#[must_use]
pub fn schema_name(type_code: &str) -> String {
    let listed = |code: &str| {
        SUPPORTED_ELEMENTS
            .iter()
            .find(|(supported, _, _)| *supported == code)
            .map(|(_, name, _)| *name)
    };
    listed(type_code)
        .or_else(|| {
            SUBTYPES
                .iter()
                .find(|(_, subtypes)| subtypes.contains(&type_code))
                .and_then(|(parent, _)| listed(parent))
        })
        .map_or_else(|| type_code.to_string(), str::to_string)
}

fn is_ifc2x3(file_schema: &str) -> bool {
    file_schema.to_ascii_uppercase().starts_with("IFC2X3")
}

/// The code itself followed by its known subtypes.
#[must_use]
pub fn expand_subtypes(type_code: &str) -> Vec<&str> {
    let mut codes = vec![type_code];
    if let Some((_, subtypes)) = SUBTYPES.iter().find(|(code, _)| *code == type_code) {
        codes.extend_from_slice(subtypes);
    }
    codes
}

/// Where `PredefinedType` sits for an entity in the given file schema, if
/// it has one.
#[must_use]
pub fn predefined_type_index(type_code: &str, file_schema: &str) -> Option<usize> {
    if is_ifc2x3(file_schema) && IFC2X3_WITHOUT_PREDEFINED_TYPE.contains(&type_code) {
        return None;
    }
    match PREDEFINED_TYPE_INDEX.iter().find(|(code, _)| *code == type_code) {
        Some((_, index)) => *index,
        None => category_for(type_code).map(|_| 8),
    }
}
