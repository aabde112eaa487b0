//! XML bodies converted to the JSON shape the portal would have sent.
//!
//! Element text becomes a string, repeated children become an array and
//! attributes are ignored. `<items/>` becomes `""`.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};

use super::GatewayError;

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Map::new(),
            text: String::new(),
        }
    }

    fn into_value(self) -> Value {
        if self.children.is_empty() {
            Value::String(self.text.trim().to_string())
        } else {
            Value::Object(self.children)
        }
    }
}

fn insert_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        Some(Value::Array(existing)) => existing.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            children.insert(name, value);
        }
    }
}

/// Parse an XML document into `{root_name: ...}`.
pub fn xml_to_json(xml: &str) -> Result<Value, GatewayError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root = Map::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                stack.push(Frame::new(name));
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let value = Value::String(String::new());
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None => insert_child(&mut root, name, value),
                }
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| GatewayError::Malformed(format!("XML text: {}", e)))?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(_)) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| GatewayError::Malformed("unbalanced XML end tag".into()))?;
                let name = frame.name.clone();
                let value = frame.into_value();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None => insert_child(&mut root, name, value),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(GatewayError::Malformed(format!("XML: {}", e))),
        }
    }

    if !stack.is_empty() {
        return Err(GatewayError::Malformed("unterminated XML element".into()));
    }
    if root.is_empty() {
        return Err(GatewayError::Malformed("empty XML document".into()));
    }

    Ok(Value::Object(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_repeated_children_become_array() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<response>
  <header><resultCode>00</resultCode><resultMsg>NORMAL SERVICE.</resultMsg></header>
  <body>
    <items>
      <item><dateKind>01</dateKind><dateName>삼일절</dateName><isHoliday>Y</isHoliday><locdate>20250301</locdate></item>
      <item><dateKind>01</dateKind><dateName>대체공휴일</dateName><isHoliday>Y</isHoliday><locdate>20250303</locdate></item>
    </items>
    <totalCount>2</totalCount>
  </body>
</response>"#;

        let value = xml_to_json(xml).unwrap();
        assert_eq!(value["response"]["header"]["resultCode"], "00");
        let items = &value["response"]["body"]["items"]["item"];
        assert_eq!(items.as_array().unwrap().len(), 2);
        assert_eq!(items[0]["dateName"], "삼일절");
        assert_eq!(items[1]["locdate"], "20250303");
    }

    #[test]
    fn test_single_child_stays_object() {
        let xml = "<response><body><items><item><dateName>광복절</dateName></item></items></body></response>";
        let value = xml_to_json(xml).unwrap();
        assert_eq!(
            value["response"]["body"]["items"],
            json!({"item": {"dateName": "광복절"}})
        );
    }

    #[test]
    fn test_empty_element_is_blank_string() {
        let value = xml_to_json("<response><body><items/></body></response>").unwrap();
        assert_eq!(value["response"]["body"]["items"], "");

        let value = xml_to_json("<response><body><items></items></body></response>").unwrap();
        assert_eq!(value["response"]["body"]["items"], "");
    }

    #[test]
    fn test_attributes_ignored_and_entities_unescaped() {
        let value = xml_to_json(r#"<a kind="x"><b lang="ko">R&amp;D</b></a>"#).unwrap();
        assert_eq!(value, json!({"a": {"b": "R&D"}}));
    }

    #[test]
    fn test_truncated_document_is_malformed() {
        assert!(xml_to_json("<response><body>").is_err());
        assert!(xml_to_json("").is_err());
    }
}
