// HTML pages, rendered from already-sorted data
//
// Every interpolated value goes through escape().

use std::fmt::Write;

use crate::entities::{Amenity, City, Place, State, User};

/// A state and its cities, both sorted by name
pub type StateCities = (State, Vec<City>);

/// A place and its owner, when the owner still exists
pub type PlaceOwner = (Place, Option<User>);

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<HTML lang=\"en\">\n  <HEAD>\n    <TITLE>{}</TITLE>\n  </HEAD>\n  <BODY>\n{}  </BODY>\n</HTML>\n",
        escape(title),
        body
    )
}

fn item(out: &mut String, indent: usize, id: &str, name: &str) {
    let _ = writeln!(
        out,
        "{:indent$}<LI>{}: <B>{}</B></LI>",
        "",
        escape(id),
        escape(name),
        indent = indent
    );
}

fn city_list(out: &mut String, indent: usize, cities: &[City]) {
    let _ = writeln!(out, "{:indent$}<UL>", "", indent = indent);
    for city in cities {
        item(out, indent + 2, &city.base.id, &city.name);
    }
    let _ = writeln!(out, "{:indent$}</UL>", "", indent = indent);
}

// ============================================================================
// PAGES
// ============================================================================

/// `/states_list` and `/states`
pub fn states_list(states: &[State]) -> String {
    let mut body = String::from("    <H1>States</H1>\n    <UL>\n");
    for state in states {
        item(&mut body, 6, &state.base.id, &state.name);
    }
    body.push_str("    </UL>\n");

    page("HBNB", &body)
}

/// `/cities_by_states`
pub fn cities_by_states(states: &[StateCities]) -> String {
    let mut body = String::from("    <H1>States</H1>\n    <UL>\n");
    for (state, cities) in states {
        let _ = writeln!(
            body,
            "      <LI>{}: <B>{}</B>",
            escape(&state.base.id),
            escape(&state.name)
        );
        city_list(&mut body, 8, cities);
        body.push_str("      </LI>\n");
    }
    body.push_str("    </UL>\n");

    page("HBNB", &body)
}

/// `/states/<id>`
pub fn state_detail(found: Option<&StateCities>) -> String {
    let Some((state, cities)) = found else {
        return page("HBNB", "    <H1>Not found!</H1>\n");
    };

    let mut body = String::new();
    let _ = writeln!(body, "    <H1>State: {}</H1>", escape(&state.name));
    body.push_str("    <H3>Cities:</H3>\n");
    city_list(&mut body, 4, cities);

    page("HBNB", &body)
}

fn filters(out: &mut String, states: &[StateCities], amenities: &[Amenity]) {
    out.push_str("    <SECTION class=\"filters\">\n");

    out.push_str("      <DIV class=\"locations\">\n        <H3>States</H3>\n        <UL class=\"popover\">\n");
    for (state, cities) in states {
        let _ = writeln!(out, "          <LI><H2>{}</H2>", escape(&state.name));
        out.push_str("            <UL>\n");
        for city in cities {
            let _ = writeln!(out, "              <LI>{}</LI>", escape(&city.name));
        }
        out.push_str("            </UL>\n          </LI>\n");
    }
    out.push_str("        </UL>\n      </DIV>\n");

    out.push_str("      <DIV class=\"amenities\">\n        <H3>Amenities</H3>\n        <UL class=\"popover\">\n");
    for amenity in amenities {
        let _ = writeln!(out, "          <LI>{}</LI>", escape(&amenity.name));
    }
    out.push_str("        </UL>\n      </DIV>\n");

    out.push_str("      <BUTTON type=\"button\">Search</BUTTON>\n    </SECTION>\n");
}

/// `/hbnb_filters`
pub fn hbnb_filters(states: &[StateCities], amenities: &[Amenity]) -> String {
    let mut body = String::new();
    filters(&mut body, states, amenities);

    page("AirBnB clone", &body)
}

fn plural(count: i64, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{} {}", count, one)
    } else {
        format!("{} {}", count, many)
    }
}

/// `/hbnb`
pub fn hbnb(states: &[StateCities], amenities: &[Amenity], places: &[PlaceOwner]) -> String {
    let mut body = String::new();
    filters(&mut body, states, amenities);

    body.push_str("    <SECTION class=\"places\">\n      <H1>Places</H1>\n");
    for (place, owner) in places {
        body.push_str("      <ARTICLE>\n");
        let _ = writeln!(body, "        <DIV class=\"title_box\">");
        let _ = writeln!(body, "          <H2>{}</H2>", escape(&place.name));
        let _ = writeln!(
            body,
            "          <DIV class=\"price_by_night\">${}</DIV>",
            place.price_by_night
        );
        body.push_str("        </DIV>\n        <DIV class=\"information\">\n");
        let _ = writeln!(
            body,
            "          <DIV class=\"max_guest\">{}</DIV>",
            plural(place.max_guest, "Guest", "Guests")
        );
        let _ = writeln!(
            body,
            "          <DIV class=\"number_rooms\">{}</DIV>",
            plural(place.number_rooms, "Bedroom", "Bedrooms")
        );
        let _ = writeln!(
            body,
            "          <DIV class=\"number_bathrooms\">{}</DIV>",
            plural(place.number_bathrooms, "Bathroom", "Bathrooms")
        );
        body.push_str("        </DIV>\n");
        if let Some(owner) = owner {
            let _ = writeln!(
                body,
                "        <DIV class=\"user\"><B>Owner:</B> {}</DIV>",
                escape(&owner.full_name())
            );
        }
        let _ = writeln!(
            body,
            "        <DIV class=\"description\">{}</DIV>",
            escape(&place.description)
        );
        body.push_str("      </ARTICLE>\n");
    }
    body.push_str("    </SECTION>\n");

    page("AirBnB clone", &body)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x" & 'y')</script>"#),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#x27;y&#x27;)&lt;/script&gt;"
        );
        assert_eq!(escape("California"), "California");
    }

    #[test]
    fn test_states_list_items() {
        let ca = State::new("California");
        let html = states_list(&[ca.clone(), State::new("<b>Nevada</b>")]);

        assert!(html.contains(&format!("<LI>{}: <B>California</B></LI>", ca.base.id)));
        assert!(html.contains("<B>&lt;b&gt;Nevada&lt;/b&gt;</B>"));
        assert!(!html.contains("<b>Nevada"));
    }

    #[test]
    fn test_cities_nested_under_states() {
        let ca = State::new("California");
        let sf = City::new(&ca.base.id, "San Francisco");
        let html = cities_by_states(&[(ca.clone(), vec![sf.clone()])]);

        let state_at = html.find("<B>California</B>").unwrap();
        let city_at = html.find("<B>San Francisco</B>").unwrap();
        assert!(state_at < city_at);
        assert!(html.contains(&format!("<LI>{}: <B>San Francisco</B></LI>", sf.base.id)));
    }

    #[test]
    fn test_state_detail_and_not_found() {
        let ca = State::new("California");
        let found = (ca, vec![]);

        assert!(state_detail(Some(&found)).contains("<H1>State: California</H1>"));
        assert!(state_detail(None).contains("<H1>Not found!</H1>"));
    }

    #[test]
    fn test_hbnb_place_listing() {
        let mut owner = User::new("a@b.c", "pwd");
        owner.first_name = "Betty".to_string();
        owner.last_name = "Holberton".to_string();
        let mut place = Place::new("c1", &owner.base.id, "Lodge");
        place.price_by_night = 120;
        place.max_guest = 1;
        place.number_rooms = 3;
        place.description = "Quiet & cosy".to_string();

        let html = hbnb(&[], &[Amenity::new("Wifi")], &[(place, Some(owner))]);

        assert!(html.contains("<H2>Lodge</H2>"));
        assert!(html.contains("$120"));
        assert!(html.contains("1 Guest<"));
        assert!(html.contains("3 Bedrooms"));
        assert!(html.contains("0 Bathrooms"));
        assert!(html.contains("<B>Owner:</B> Betty Holberton"));
        assert!(html.contains("Quiet &amp; cosy"));
        assert!(html.contains("<LI>Wifi</LI>"));
    }
}
