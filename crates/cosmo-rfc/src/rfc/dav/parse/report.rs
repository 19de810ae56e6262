//! `CALDAV:calendar-query` REPORT body parsing (RFC 4791 §7.8).
//!
//! Elements are matched by local name. Each `parse_*` function is entered
//! just after the start tag of its element and returns after consuming the
//! matching end tag.

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::error::{ParseError, ParseResult};
use crate::rfc::dav::core::{
    CalendarFilter, CalendarQuery, CompFilter, ComponentSelection, MatchType, ParamFilter,
    PropFilter, TextMatch, TimeRange,
};
use crate::rfc::ical::core::parse_compact_datetime;

type XmlReader<'a> = Reader<&'a [u8]>;

/// ## Summary
/// Parses a calendar-query REPORT body.
///
/// ## Errors
/// Returns a [`ParseError`] when the XML is malformed, the root element is
/// not `calendar-query`, the filter is missing or not rooted at
/// `VCALENDAR`, or a time-range is not a pair of UTC values with
/// `start < end`.
pub fn parse_calendar_query(xml: &[u8]) -> ParseResult<CalendarQuery> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local_name(&e)?;
                if name != "calendar-query" {
                    return Err(ParseError::unexpected_element(&name));
                }
                break;
            }
            Event::Empty(e) => {
                let name = local_name(&e)?;
                if name == "calendar-query" {
                    return Err(ParseError::missing_element("filter"));
                }
                return Err(ParseError::unexpected_element(&name));
            }
            Event::Eof => return Err(ParseError::missing_element("calendar-query")),
            _ => {}
        }
        buf.clear();
    }

    let mut filter = None;
    let mut timezone_id = None;
    let mut expand = None;
    let mut selection = None;
    let mut limit = None;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match local_name(&e)?.as_str() {
                "filter" => filter = Some(parse_filter(&mut reader)?),
                "prop" => {
                    let data = parse_prop(&mut reader)?;
                    selection = data.selection.or(selection);
                    expand = data.expand.or(expand);
                }
                "timezone-id" => {
                    let tzid = read_text(&mut reader)?;
                    if tzid.is_empty() {
                        return Err(ParseError::invalid_value("empty timezone-id"));
                    }
                    timezone_id = Some(tzid);
                }
                "timezone" => {
                    return Err(ParseError::invalid_value(
                        "CALDAV:timezone is not supported, send CALDAV:timezone-id",
                    ));
                }
                "limit" => limit = parse_limit(&mut reader)?,
                other => {
                    tracing::trace!(element = other, "Skipping calendar-query child");
                    skip_element(&mut reader)?;
                }
            },
            Event::Empty(e) => {
                if local_name(&e)? == "filter" {
                    return Err(ParseError::missing_element("comp-filter"));
                }
            }
            Event::End(_) | Event::Eof => break,
            _ => {}
        }
    }

    let filter = filter.ok_or_else(|| ParseError::missing_element("filter"))?;
    tracing::debug!(
        timezone_id = ?timezone_id,
        expand = expand.is_some(),
        limit = ?limit,
        "Parsed calendar-query"
    );

    Ok(CalendarQuery {
        filter,
        timezone_id,
        expand,
        selection,
        limit,
    })
}

/// ## Summary
/// Reads a `YYYYMMDDTHHMMSSZ` value.
///
/// ## Errors
/// Any other form, including a local time or a numeric offset, is
/// rejected.
pub fn parse_utc_datetime(value: &str) -> ParseResult<DateTime<Utc>> {
    value
        .strip_suffix('Z')
        .and_then(parse_compact_datetime)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ParseError::invalid_value(format!("not a UTC date-time: {value}")))
}

fn parse_filter(reader: &mut XmlReader<'_>) -> ParseResult<CalendarFilter> {
    let mut root = None;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = root_name(&e, root.is_some())?;
                root = Some(parse_comp_filter(reader, name)?);
            }
            Event::Empty(e) => {
                let name = root_name(&e, root.is_some())?;
                root = Some(CompFilter::new(name));
            }
            Event::End(_) => break,
            Event::Eof => return Err(ParseError::xml("document ended inside filter")),
            _ => {}
        }
    }

    root.map(|root| CalendarFilter { root })
        .ok_or_else(|| ParseError::missing_element("comp-filter"))
}

fn root_name(e: &BytesStart<'_>, seen: bool) -> ParseResult<String> {
    let element = local_name(e)?;
    if element != "comp-filter" {
        return Err(ParseError::unexpected_element(&element));
    }
    if seen {
        return Err(ParseError::invalid_value(
            "filter must contain exactly one comp-filter",
        ));
    }
    let name = get_attribute(e, "comp-filter", "name")?;
    if !name.eq_ignore_ascii_case("VCALENDAR") {
        return Err(ParseError::invalid_value(format!(
            "filter must be rooted at VCALENDAR, found {name}"
        )));
    }
    Ok(name)
}

fn parse_comp_filter(reader: &mut XmlReader<'_>, name: String) -> ParseResult<CompFilter> {
    let mut filter = CompFilter::new(name);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match local_name(&e)?.as_str() {
                "comp-filter" => {
                    let name = get_attribute(&e, "comp-filter", "name")?;
                    let nested = parse_comp_filter(reader, name)?;
                    filter.comp_filters.push(nested);
                }
                "prop-filter" => {
                    let name = get_attribute(&e, "prop-filter", "name")?;
                    let prop = parse_prop_filter(reader, name)?;
                    filter.prop_filters.push(prop);
                }
                "time-range" => {
                    filter.time_range = Some(parse_time_range(&e)?);
                    skip_element(reader)?;
                }
                "is-not-defined" => {
                    filter.is_not_defined = true;
                    skip_element(reader)?;
                }
                other => return Err(ParseError::unexpected_element(other)),
            },
            Event::Empty(e) => match local_name(&e)?.as_str() {
                "comp-filter" => {
                    let name = get_attribute(&e, "comp-filter", "name")?;
                    filter.comp_filters.push(CompFilter::new(name));
                }
                "prop-filter" => {
                    let name = get_attribute(&e, "prop-filter", "name")?;
                    filter.prop_filters.push(PropFilter::new(name));
                }
                "time-range" => filter.time_range = Some(parse_time_range(&e)?),
                "is-not-defined" => filter.is_not_defined = true,
                other => return Err(ParseError::unexpected_element(other)),
            },
            Event::End(_) => break,
            Event::Eof => return Err(ParseError::xml("document ended inside comp-filter")),
            _ => {}
        }
    }

    Ok(filter)
}

fn parse_prop_filter(reader: &mut XmlReader<'_>, name: String) -> ParseResult<PropFilter> {
    let mut filter = PropFilter::new(name);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match local_name(&e)?.as_str() {
                "text-match" => {
                    let attrs = TextMatchAttributes::read(&e)?;
                    let value = read_text(reader)?;
                    filter.text_match = Some(attrs.into_text_match(value));
                }
                "param-filter" => {
                    let name = get_attribute(&e, "param-filter", "name")?;
                    let param = parse_param_filter(reader, name)?;
                    filter.param_filters.push(param);
                }
                "time-range" => {
                    filter.time_range = Some(parse_time_range(&e)?);
                    skip_element(reader)?;
                }
                "is-not-defined" => {
                    filter.is_not_defined = true;
                    skip_element(reader)?;
                }
                other => return Err(ParseError::unexpected_element(other)),
            },
            Event::Empty(e) => match local_name(&e)?.as_str() {
                "text-match" => {
                    let attrs = TextMatchAttributes::read(&e)?;
                    filter.text_match = Some(attrs.into_text_match(String::new()));
                }
                "param-filter" => {
                    let name = get_attribute(&e, "param-filter", "name")?;
                    filter.param_filters.push(ParamFilter::new(name));
                }
                "time-range" => filter.time_range = Some(parse_time_range(&e)?),
                "is-not-defined" => filter.is_not_defined = true,
                other => return Err(ParseError::unexpected_element(other)),
            },
            Event::End(_) => break,
            Event::Eof => return Err(ParseError::xml("document ended inside prop-filter")),
            _ => {}
        }
    }

    Ok(filter)
}

fn parse_param_filter(reader: &mut XmlReader<'_>, name: String) -> ParseResult<ParamFilter> {
    let mut filter = ParamFilter::new(name);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match local_name(&e)?.as_str() {
                "text-match" => {
                    let attrs = TextMatchAttributes::read(&e)?;
                    let value = read_text(reader)?;
                    filter.text_match = Some(attrs.into_text_match(value));
                }
                "is-not-defined" => {
                    filter.is_not_defined = true;
                    skip_element(reader)?;
                }
                other => return Err(ParseError::unexpected_element(other)),
            },
            Event::Empty(e) => match local_name(&e)?.as_str() {
                "text-match" => {
                    let attrs = TextMatchAttributes::read(&e)?;
                    filter.text_match = Some(attrs.into_text_match(String::new()));
                }
                "is-not-defined" => filter.is_not_defined = true,
                other => return Err(ParseError::unexpected_element(other)),
            },
            Event::End(_) => break,
            Event::Eof => return Err(ParseError::xml("document ended inside param-filter")),
            _ => {}
        }
    }

    Ok(filter)
}

struct TextMatchAttributes {
    collation: Option<String>,
    negate: bool,
    match_type: MatchType,
}

impl TextMatchAttributes {
    fn read(e: &BytesStart<'_>) -> ParseResult<Self> {
        let mut attrs = Self {
            collation: None,
            negate: false,
            match_type: MatchType::default(),
        };

        for attr in e.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.local_name().into_inner())?;
            let value = std::str::from_utf8(&attr.value)?;
            match key {
                "collation" => attrs.collation = Some(value.to_owned()),
                "negate-condition" => {
                    attrs.negate = match value {
                        "yes" | "true" => true,
                        "no" | "false" => false,
                        _ => {
                            return Err(ParseError::invalid_value(format!(
                                "invalid negate-condition: {value}"
                            )));
                        }
                    };
                }
                "match-type" => {
                    attrs.match_type = MatchType::parse(value).ok_or_else(|| {
                        ParseError::invalid_value(format!("invalid match-type: {value}"))
                    })?;
                }
                _ => {}
            }
        }

        Ok(attrs)
    }

    fn into_text_match(self, value: String) -> TextMatch {
        TextMatch {
            value,
            collation: self.collation,
            match_type: self.match_type,
            negate: self.negate,
        }
    }
}

fn parse_time_range(e: &BytesStart<'_>) -> ParseResult<TimeRange> {
    let start = parse_utc_datetime(&get_attribute(e, "time-range", "start")?)?;
    let end = parse_utc_datetime(&get_attribute(e, "time-range", "end")?)?;
    TimeRange::new(start, end)
        .ok_or_else(|| ParseError::invalid_value("time-range end must be after start"))
}

/// Contents of a `DAV:prop` element that shape the response.
#[derive(Default)]
struct CalendarDataRequest {
    selection: Option<ComponentSelection>,
    expand: Option<TimeRange>,
}

fn parse_prop(reader: &mut XmlReader<'_>) -> ParseResult<CalendarDataRequest> {
    let mut data = CalendarDataRequest::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if local_name(&e)? == "calendar-data" {
                    data = parse_calendar_data(reader)?;
                } else {
                    skip_element(reader)?;
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(ParseError::xml("document ended inside prop")),
            _ => {}
        }
    }

    Ok(data)
}

fn parse_calendar_data(reader: &mut XmlReader<'_>) -> ParseResult<CalendarDataRequest> {
    let mut data = CalendarDataRequest::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match local_name(&e)?.as_str() {
                "comp" => {
                    let name = get_attribute(&e, "comp", "name")?;
                    data.selection = Some(parse_comp_selection(reader, name)?);
                }
                "expand" => {
                    data.expand = Some(parse_time_range(&e)?);
                    skip_element(reader)?;
                }
                other => {
                    tracing::trace!(element = other, "Ignoring calendar-data child");
                    skip_element(reader)?;
                }
            },
            Event::Empty(e) => match local_name(&e)?.as_str() {
                "comp" => {
                    let name = get_attribute(&e, "comp", "name")?;
                    data.selection = Some(ComponentSelection::new(name));
                }
                "expand" => data.expand = Some(parse_time_range(&e)?),
                _ => {}
            },
            Event::End(_) => break,
            Event::Eof => return Err(ParseError::xml("document ended inside calendar-data")),
            _ => {}
        }
    }

    Ok(data)
}

fn parse_comp_selection(
    reader: &mut XmlReader<'_>,
    name: String,
) -> ParseResult<ComponentSelection> {
    let mut selection = ComponentSelection::new(name);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let element = local_name(&e)?;
                match element.as_str() {
                    "comp" => {
                        let name = get_attribute(&e, "comp", "name")?;
                        let nested = parse_comp_selection(reader, name)?;
                        selection.comps.push(nested);
                        continue;
                    }
                    "prop" => {
                        let name = get_attribute(&e, "prop", "name")?;
                        selection = selection.with_prop(name);
                    }
                    "allprop" => selection.all_props = true,
                    "allcomp" => selection.all_comps = true,
                    _ => {}
                }
                skip_element(reader)?;
            }
            Event::Empty(e) => match local_name(&e)?.as_str() {
                "comp" => {
                    let name = get_attribute(&e, "comp", "name")?;
                    selection.comps.push(ComponentSelection::new(name));
                }
                "prop" => {
                    let name = get_attribute(&e, "prop", "name")?;
                    selection = selection.with_prop(name);
                }
                "allprop" => selection.all_props = true,
                "allcomp" => selection.all_comps = true,
                _ => {}
            },
            Event::End(_) => break,
            Event::Eof => return Err(ParseError::xml("document ended inside comp")),
            _ => {}
        }
    }

    Ok(selection)
}

fn parse_limit(reader: &mut XmlReader<'_>) -> ParseResult<Option<u32>> {
    let mut limit = None;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if local_name(&e)? == "nresults" {
                    limit = Some(parse_nresults_value(&read_text(reader)?)?);
                } else {
                    skip_element(reader)?;
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(ParseError::xml("document ended inside limit")),
            _ => {}
        }
    }

    Ok(limit)
}

fn parse_nresults_value(value: &str) -> ParseResult<u32> {
    value
        .parse::<u32>()
        .map_err(|err| ParseError::invalid_value(format!("invalid nresults value: {value} ({err})")))
}

/// Collects character data up to the end of the current element.
fn read_text(reader: &mut XmlReader<'_>) -> ParseResult<String> {
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&reader.decoder().decode(e.as_ref())?),
            Event::CData(e) => text.push_str(&reader.decoder().decode(e.as_ref())?),
            Event::GeneralRef(e) => {
                if let Some(ch) = e.resolve_char_ref()? {
                    text.push(ch);
                } else {
                    let entity = reader.decoder().decode(e.as_ref())?;
                    let resolved = quick_xml::escape::resolve_predefined_entity(&entity)
                        .ok_or_else(|| {
                            ParseError::invalid_value(format!("unknown entity: &{entity};"))
                        })?;
                    text.push_str(resolved);
                }
            }
            Event::Start(_) => skip_element(reader)?,
            Event::End(_) => break,
            Event::Eof => return Err(ParseError::xml("document ended inside text element")),
            _ => {}
        }
    }

    Ok(text.trim().to_owned())
}

/// Consumes everything up to the end tag of the current element.
fn skip_element(reader: &mut XmlReader<'_>) -> ParseResult<()> {
    let mut depth = 1_usize;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => return Err(ParseError::xml("unexpected end of document")),
            _ => {}
        }
    }
}

fn local_name(e: &BytesStart<'_>) -> ParseResult<String> {
    Ok(std::str::from_utf8(e.local_name().as_ref())?.to_owned())
}

fn get_attribute(e: &BytesStart<'_>, element: &str, name: &str) -> ParseResult<String> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(std::str::from_utf8(&attr.value)?.to_owned());
        }
    }
    Err(ParseError::missing_attribute(element, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn query_with_filter(filter: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8" ?>
<C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:prop><D:getetag/></D:prop>
  <C:filter>{filter}</C:filter>
</C:calendar-query>"#
        )
    }

    #[test_log::test]
    fn parses_full_query() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?>
<C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:prop>
    <D:getetag/>
    <C:calendar-data>
      <C:comp name="VCALENDAR">
        <C:prop name="VERSION"/>
        <C:comp name="VEVENT">
          <C:prop name="SUMMARY"/>
          <C:prop name="DTSTART"/>
        </C:comp>
      </C:comp>
      <C:expand start="20070212T000000Z" end="20070214T000000Z"/>
    </C:calendar-data>
  </D:prop>
  <C:filter>
    <C:comp-filter name="VCALENDAR">
      <C:comp-filter name="VEVENT">
        <C:time-range start="20070212T000000Z" end="20070213T000000Z"/>
      </C:comp-filter>
    </C:comp-filter>
  </C:filter>
  <C:timezone-id>America/Chicago</C:timezone-id>
  <D:limit><D:nresults>10</D:nresults></D:limit>
</C:calendar-query>"#;

        let query = parse_calendar_query(xml.as_bytes()).unwrap();

        let event = &query.filter.root.comp_filters[0];
        assert_eq!(event.name, "VEVENT");
        let range = event.time_range.unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2007, 2, 12, 0, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2007, 2, 13, 0, 0, 0).unwrap());

        assert_eq!(query.timezone_id.as_deref(), Some("America/Chicago"));
        assert_eq!(query.limit, Some(10));
        assert_eq!(
            query.expand.unwrap().end,
            Utc.with_ymd_and_hms(2007, 2, 14, 0, 0, 0).unwrap()
        );

        let selection = query.selection.unwrap();
        assert!(selection.keeps_prop("VERSION"));
        let vevent = selection.child("VEVENT").unwrap();
        assert_eq!(vevent.props, vec!["SUMMARY", "DTSTART"]);
    }

    #[test]
    fn parses_text_match_attributes() {
        let xml = query_with_filter(
            r#"<C:comp-filter name="VCALENDAR">
                 <C:comp-filter name="VEVENT">
                   <C:prop-filter name="SUMMARY">
                     <C:text-match collation="i;octet" negate-condition="yes"
                                   match-type="starts-with">Tom &amp; Jerry</C:text-match>
                   </C:prop-filter>
                   <C:prop-filter name="DTSTART">
                     <C:param-filter name="VALUE">
                       <C:text-match>DATE-TIME</C:text-match>
                     </C:param-filter>
                     <C:param-filter name="BOGUS"><C:is-not-defined/></C:param-filter>
                   </C:prop-filter>
                   <C:prop-filter name="RRULE"><C:is-not-defined/></C:prop-filter>
                 </C:comp-filter>
               </C:comp-filter>"#,
        );
        let query = parse_calendar_query(xml.as_bytes()).unwrap();
        let event = &query.filter.root.comp_filters[0];

        let summary = event.prop_filters[0].text_match.as_ref().unwrap();
        assert_eq!(summary.value, "Tom & Jerry");
        assert_eq!(summary.collation.as_deref(), Some("i;octet"));
        assert_eq!(summary.match_type, MatchType::StartsWith);
        assert!(summary.negate);

        let dtstart = &event.prop_filters[1];
        assert_eq!(dtstart.param_filters.len(), 2);
        let value = dtstart.param_filters[0].text_match.as_ref().unwrap();
        assert_eq!(value.match_type, MatchType::Contains);
        assert!(!value.negate);
        assert!(dtstart.param_filters[1].is_not_defined);

        assert!(event.prop_filters[2].is_not_defined);
    }

    #[test]
    fn parses_nested_component_filters() {
        let xml = query_with_filter(
            r#"<C:comp-filter name="VCALENDAR">
                 <C:comp-filter name="VEVENT">
                   <C:comp-filter name="VALARM">
                     <C:time-range start="20060104T140000Z" end="20060105T000000Z"/>
                   </C:comp-filter>
                 </C:comp-filter>
                 <C:comp-filter name="VTODO"><C:is-not-defined/></C:comp-filter>
               </C:comp-filter>"#,
        );
        let query = parse_calendar_query(xml.as_bytes()).unwrap();
        let root = &query.filter.root;
        assert_eq!(root.comp_filters.len(), 2);
        assert!(root.comp_filters[0].comp_filters[0].time_range.is_some());
        assert!(root.comp_filters[1].is_not_defined);
        assert_eq!(query.filter.top_level_time_ranges().count(), 0);
    }

    #[test]
    fn time_range_must_be_utc_pair() {
        for range in [
            r#"<C:time-range start="20060104T140000" end="20060105T000000Z"/>"#,
            r#"<C:time-range start="20060104T140000Z"/>"#,
            r#"<C:time-range end="20060104T140000Z"/>"#,
            r#"<C:time-range start="2006-01-04T14:00:00Z" end="20060105T000000Z"/>"#,
            r#"<C:time-range start="20060105T000000Z" end="20060104T140000Z"/>"#,
        ] {
            let xml = query_with_filter(&format!(
                r#"<C:comp-filter name="VCALENDAR"><C:comp-filter name="VEVENT">{range}</C:comp-filter></C:comp-filter>"#
            ));
            assert!(
                parse_calendar_query(xml.as_bytes()).is_err(),
                "accepted {range}"
            );
        }
    }

    #[test]
    fn filter_shape_is_checked() {
        let missing = r#"<C:calendar-query xmlns:C="urn:ietf:params:xml:ns:caldav"/>"#;
        assert!(matches!(
            parse_calendar_query(missing.as_bytes()).unwrap_err(),
            ParseError::MissingElement("filter")
        ));

        let wrong_root = query_with_filter(r#"<C:comp-filter name="VEVENT"/>"#);
        assert!(matches!(
            parse_calendar_query(wrong_root.as_bytes()).unwrap_err(),
            ParseError::InvalidValue(_)
        ));

        let no_name = query_with_filter("<C:comp-filter/>");
        assert!(matches!(
            parse_calendar_query(no_name.as_bytes()).unwrap_err(),
            ParseError::MissingAttribute { .. }
        ));

        let other_report = r#"<C:calendar-multiget xmlns:C="urn:ietf:params:xml:ns:caldav"/>"#;
        assert!(matches!(
            parse_calendar_query(other_report.as_bytes()).unwrap_err(),
            ParseError::UnexpectedElement(_)
        ));
    }

    #[test]
    fn rejects_bad_attribute_values() {
        let xml = query_with_filter(
            r#"<C:comp-filter name="VCALENDAR"><C:comp-filter name="VEVENT">
                 <C:prop-filter name="SUMMARY">
                   <C:text-match match-type="sounds-like">x</C:text-match>
                 </C:prop-filter>
               </C:comp-filter></C:comp-filter>"#,
        );
        assert!(parse_calendar_query(xml.as_bytes()).is_err());

        let xml = query_with_filter(
            r#"<C:comp-filter name="VCALENDAR"><C:comp-filter name="VEVENT">
                 <C:prop-filter name="SUMMARY">
                   <C:text-match negate-condition="maybe">x</C:text-match>
                 </C:prop-filter>
               </C:comp-filter></C:comp-filter>"#,
        );
        assert!(parse_calendar_query(xml.as_bytes()).is_err());
    }

    #[test]
    fn utc_datetime_forms() {
        assert_eq!(
            parse_utc_datetime("20060104T140000Z").unwrap(),
            Utc.with_ymd_and_hms(2006, 1, 4, 14, 0, 0).unwrap()
        );
        assert!(parse_utc_datetime("20060104T140000").is_err());
        assert!(parse_utc_datetime("20060104T140000+0100").is_err());
        assert!(parse_utc_datetime("20061304T140000Z").is_err());
    }
}
