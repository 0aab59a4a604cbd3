//! Item struct -- one gradable entity: an activity, a category total or the
//! course total.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::compare::{as_number, value_to_string};
use crate::enums::ItemType;
use crate::iteminfo::{self, ItemInfoError};

/// Properties backed by a column of the grade item record, in column order.
pub const NATIVE_PROPERTIES: &[&str] = &[
    "id",
    "courseid",
    "categoryid",
    "itemname",
    "itemtype",
    "itemmodule",
    "iteminstance",
    "itemnumber",
    "iteminfo",
    "idnumber",
    "calculation",
    "gradetype",
    "grademax",
    "grademin",
    "scaleid",
    "outcomeid",
    "gradepass",
    "multfactor",
    "plusfactor",
    "aggregationcoef",
    "aggregationcoef2",
    "sortorder",
    "display",
    "decimals",
    "hidden",
    "locked",
    "locktime",
    "needsupdate",
    "weightoverride",
    "timecreated",
    "timemodified",
];

/// Read-only properties joined from related records or derived at load time.
pub const CONTEXT_PROPERTIES: &[&str] = &[
    "depth",
    "itemdepth",
    "thiscatid",
    "fullname",
    "coursename",
    "grademax_total",
    "aggregationcoef_total",
];

/// Error type for property writes.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("property '{0}' is read-only")]
    ReadOnly(String),

    #[error("value '{value}' is not valid for property '{property}'")]
    InvalidValue { property: String, value: String },

    #[error(transparent)]
    ItemInfo(#[from] ItemInfoError),
}

fn is_false(b: &bool) -> bool {
    !b
}

/// A grade item plus the context the category view needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    // ===== Identity =====
    pub id: i64,
    pub courseid: i64,
    pub categoryid: Option<i64>,
    pub itemname: String,
    pub itemtype: ItemType,
    pub itemmodule: String,
    pub iteminstance: Option<i64>,
    pub itemnumber: Option<i64>,
    pub idnumber: String,

    // ===== Free text =====
    pub iteminfo: String,
    pub calculation: String,

    // ===== Grading =====
    pub gradetype: i64,
    pub grademax: f64,
    pub grademin: f64,
    pub scaleid: Option<i64>,
    pub outcomeid: Option<i64>,
    pub gradepass: f64,
    pub multfactor: f64,
    pub plusfactor: f64,
    pub aggregationcoef: f64,
    pub aggregationcoef2: f64,
    pub sortorder: i64,
    pub display: i64,
    pub decimals: Option<i64>,
    pub hidden: i64,
    pub locked: i64,
    pub locktime: i64,
    pub needsupdate: i64,
    pub weightoverride: i64,
    pub timecreated: i64,
    pub timemodified: i64,

    // ===== Joined context (read-only) =====
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itemdepth: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thiscatid: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fullname: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub coursename: String,

    // ===== Derived =====
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grademax_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregationcoef_total: Option<f64>,

    /// Set on items whose stored row changed during the current request.
    #[serde(skip_serializing_if = "is_false", skip_deserializing)]
    pub dirty: bool,

    /// Custom properties decoded from `iteminfo`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Item {
    fn default() -> Self {
        Self {
            id: 0,
            courseid: 0,
            categoryid: None,
            itemname: String::new(),
            itemtype: ItemType::default(),
            itemmodule: String::new(),
            iteminstance: None,
            itemnumber: None,
            idnumber: String::new(),
            iteminfo: String::new(),
            calculation: String::new(),
            gradetype: 1,
            grademax: 100.0,
            grademin: 0.0,
            scaleid: None,
            outcomeid: None,
            gradepass: 0.0,
            multfactor: 1.0,
            plusfactor: 0.0,
            aggregationcoef: 0.0,
            aggregationcoef2: 0.0,
            sortorder: 0,
            display: 0,
            decimals: None,
            hidden: 0,
            locked: 0,
            locktime: 0,
            needsupdate: 0,
            weightoverride: 0,
            timecreated: 0,
            timemodified: 0,
            depth: None,
            itemdepth: None,
            thiscatid: None,
            fullname: String::new(),
            coursename: String::new(),
            grademax_total: None,
            aggregationcoef_total: None,
            dirty: false,
            extra: BTreeMap::new(),
        }
    }
}

fn opt_i64(v: Option<i64>) -> Value {
    v.map(Value::from).unwrap_or(Value::Null)
}

fn opt_f64(v: Option<f64>) -> Value {
    v.map(Value::from).unwrap_or(Value::Null)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

impl Item {
    /// Returns `true` if `name` is stored in a grade item column.
    pub fn is_native_property(name: &str) -> bool {
        NATIVE_PROPERTIES.contains(&name)
    }

    /// Returns `true` if `name` is joined or derived context.
    pub fn is_context_property(name: &str) -> bool {
        CONTEXT_PROPERTIES.contains(&name)
    }

    /// Display name: the course name for the course item, otherwise the item
    /// name, falling back to the category name.
    pub fn display_name(&self) -> &str {
        if !self.itemname.is_empty() {
            &self.itemname
        } else {
            &self.fullname
        }
    }

    /// Reads a property by name. Native and context properties always
    /// resolve (possibly to `null`); custom properties resolve only if set.
    pub fn property(&self, name: &str) -> Option<Value> {
        let value = match name {
            "id" => Value::from(self.id),
            "courseid" => Value::from(self.courseid),
            "categoryid" => opt_i64(self.categoryid),
            "itemname" => Value::from(self.itemname.as_str()),
            "itemtype" => Value::from(self.itemtype.as_str()),
            "itemmodule" => Value::from(self.itemmodule.as_str()),
            "iteminstance" => opt_i64(self.iteminstance),
            "itemnumber" => opt_i64(self.itemnumber),
            "iteminfo" => Value::from(iteminfo::notes(&self.iteminfo)),
            "idnumber" => Value::from(self.idnumber.as_str()),
            "calculation" => Value::from(self.calculation.as_str()),
            "gradetype" => Value::from(self.gradetype),
            "grademax" => Value::from(self.grademax),
            "grademin" => Value::from(self.grademin),
            "scaleid" => opt_i64(self.scaleid),
            "outcomeid" => opt_i64(self.outcomeid),
            "gradepass" => Value::from(self.gradepass),
            "multfactor" => Value::from(self.multfactor),
            "plusfactor" => Value::from(self.plusfactor),
            "aggregationcoef" => Value::from(self.aggregationcoef),
            "aggregationcoef2" => Value::from(self.aggregationcoef2),
            "sortorder" => Value::from(self.sortorder),
            "display" => Value::from(self.display),
            "decimals" => opt_i64(self.decimals),
            "hidden" => Value::from(self.hidden),
            "locked" => Value::from(self.locked),
            "locktime" => Value::from(self.locktime),
            "needsupdate" => Value::from(self.needsupdate),
            "weightoverride" => Value::from(self.weightoverride),
            "timecreated" => Value::from(self.timecreated),
            "timemodified" => Value::from(self.timemodified),
            "depth" => opt_i64(self.depth),
            "itemdepth" => opt_i64(self.itemdepth),
            "thiscatid" => opt_i64(self.thiscatid),
            "fullname" => Value::from(self.fullname.as_str()),
            "coursename" => Value::from(self.coursename.as_str()),
            "grademax_total" => opt_f64(self.grademax_total),
            "aggregationcoef_total" => opt_f64(self.aggregationcoef_total),
            other => return self.extra.get(other).cloned(),
        };
        Some(value)
    }

    /// Writes a property. Native properties are assigned to their column;
    /// any other name is stored in the `iteminfo` block and mirrored into
    /// `extra`. Context properties cannot be written.
    pub fn set_property(&mut self, name: &str, value: Value) -> Result<(), ItemError> {
        if Self::is_context_property(name) {
            return Err(ItemError::ReadOnly(name.to_owned()));
        }
        if !Self::is_native_property(name) {
            return self.set_iteminfo_property(name, value);
        }

        let invalid = || ItemError::InvalidValue {
            property: name.to_owned(),
            value: value_to_string(&value),
        };
        let number = || -> Result<f64, ItemError> {
            if is_blank(&value) {
                Ok(0.0)
            } else {
                as_number(&value).ok_or_else(invalid)
            }
        };
        // Integer columns refuse fractions rather than truncating them.
        let whole = |n: f64| -> Result<i64, ItemError> {
            if n.fract() == 0.0 {
                Ok(n as i64)
            } else {
                Err(invalid())
            }
        };
        let opt_int = || -> Result<Option<i64>, ItemError> {
            if is_blank(&value) {
                Ok(None)
            } else {
                let n = as_number(&value).ok_or_else(invalid)?;
                whole(n).map(Some)
            }
        };
        let int = || -> Result<i64, ItemError> { whole(number()?) };
        let text = || value_to_string(&value);

        match name {
            "id" => self.id = int()?,
            "courseid" => self.courseid = int()?,
            "categoryid" => self.categoryid = opt_int()?,
            "itemname" => self.itemname = text(),
            "itemtype" => self.itemtype = ItemType::from(text()),
            "itemmodule" => self.itemmodule = text(),
            "iteminstance" => self.iteminstance = opt_int()?,
            "itemnumber" => self.itemnumber = opt_int()?,
            "iteminfo" => self.iteminfo = iteminfo::replace_notes(&self.iteminfo, &text())?,
            "idnumber" => self.idnumber = text(),
            "calculation" => self.calculation = text(),
            "gradetype" => self.gradetype = int()?,
            "grademax" => self.grademax = number()?,
            "grademin" => self.grademin = number()?,
            "scaleid" => self.scaleid = opt_int()?,
            "outcomeid" => self.outcomeid = opt_int()?,
            "gradepass" => self.gradepass = number()?,
            "multfactor" => self.multfactor = number()?,
            "plusfactor" => self.plusfactor = number()?,
            "aggregationcoef" => self.aggregationcoef = number()?,
            "aggregationcoef2" => self.aggregationcoef2 = number()?,
            "sortorder" => self.sortorder = int()?,
            "display" => self.display = int()?,
            "decimals" => self.decimals = opt_int()?,
            "hidden" => self.hidden = int()?,
            "locked" => self.locked = int()?,
            "locktime" => self.locktime = int()?,
            "needsupdate" => self.needsupdate = int()?,
            "weightoverride" => self.weightoverride = int()?,
            "timecreated" => self.timecreated = int()?,
            "timemodified" => self.timemodified = int()?,
            _ => return Err(ItemError::ReadOnly(name.to_owned())),
        }
        Ok(())
    }

    /// The decoded custom property block, if any.
    pub fn iteminfo_data(&self) -> Option<Map<String, Value>> {
        iteminfo::extract(&self.iteminfo)
    }

    /// Stores a custom property in the `iteminfo` block and in `extra`.
    pub fn set_iteminfo_property(&mut self, name: &str, value: Value) -> Result<(), ItemError> {
        self.iteminfo = iteminfo::insert(&self.iteminfo, name, value.clone())?;
        self.extra.insert(name.to_owned(), value);
        Ok(())
    }

    /// Copies custom properties from the `iteminfo` block into `extra`.
    /// Keys naming native or context properties are ignored.
    pub fn merge_iteminfo(&mut self) {
        let Some(data) = self.iteminfo_data() else {
            return;
        };
        for (key, value) in data {
            if Self::is_native_property(&key) || Self::is_context_property(&key) {
                continue;
            }
            self.extra.insert(key, value);
        }
    }

    /// Flattens native, context and custom properties into one JSON object
    /// for template rendering.
    pub fn to_template_data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        for name in NATIVE_PROPERTIES.iter().chain(CONTEXT_PROPERTIES) {
            if let Some(value) = self.property(name) {
                data.insert((*name).to_owned(), value);
            }
        }
        for (key, value) in &self.extra {
            data.entry(key.clone()).or_insert_with(|| value.clone());
        }
        data
    }
}

/// Builder for constructing items in fixtures and tests.
pub struct ItemBuilder {
    item: Item,
}

impl ItemBuilder {
    /// Creates a new builder with the given id and name.
    pub fn new(id: i64, itemname: impl Into<String>) -> Self {
        let item = Item {
            id,
            itemname: itemname.into(),
            ..Item::default()
        };
        Self { item }
    }

    pub fn courseid(mut self, courseid: i64) -> Self {
        self.item.courseid = courseid;
        self
    }

    pub fn categoryid(mut self, categoryid: i64) -> Self {
        self.item.categoryid = Some(categoryid);
        self
    }

    pub fn itemtype(mut self, itemtype: ItemType) -> Self {
        self.item.itemtype = itemtype;
        self
    }

    pub fn itemmodule(mut self, itemmodule: impl Into<String>) -> Self {
        self.item.itemmodule = itemmodule.into();
        self
    }

    pub fn iteminstance(mut self, iteminstance: i64) -> Self {
        self.item.iteminstance = Some(iteminstance);
        self
    }

    pub fn idnumber(mut self, idnumber: impl Into<String>) -> Self {
        self.item.idnumber = idnumber.into();
        self
    }

    pub fn iteminfo(mut self, iteminfo: impl Into<String>) -> Self {
        self.item.iteminfo = iteminfo.into();
        self
    }

    pub fn gradetype(mut self, gradetype: i64) -> Self {
        self.item.gradetype = gradetype;
        self
    }

    pub fn grademax(mut self, grademax: f64) -> Self {
        self.item.grademax = grademax;
        self
    }

    pub fn gradepass(mut self, gradepass: f64) -> Self {
        self.item.gradepass = gradepass;
        self
    }

    pub fn aggregationcoef(mut self, aggregationcoef: f64) -> Self {
        self.item.aggregationcoef = aggregationcoef;
        self
    }

    pub fn sortorder(mut self, sortorder: i64) -> Self {
        self.item.sortorder = sortorder;
        self
    }

    pub fn decimals(mut self, decimals: i64) -> Self {
        self.item.decimals = Some(decimals);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.item.extra.insert(key.into(), value);
        self
    }

    pub fn build(self) -> Item {
        self.item
    }
}
