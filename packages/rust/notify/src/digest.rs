//! HTML digest of a research package for the daily email.

use deepcut_shared::{ResearchPackage, SectionKey};

/// Subject line for the daily digest.
pub fn digest_subject(top_title: &str) -> String {
    format!("DeepCut Daily: {top_title}")
}

/// Render the package as a self-contained HTML email body.
///
/// Sections that fell back to raw text are shown verbatim in a `<pre>` block;
/// structured sections are rendered from their typed views.
pub fn build_email_html(topic: &str, package: &ResearchPackage) -> String {
    let title = package.display_title(topic);
    let mut html = String::new();

    html.push_str(
        "<!DOCTYPE html><html><body style=\"font-family:Georgia,serif;max-width:680px;margin:0 auto;color:#1a1a1a\">",
    );
    html.push_str(&format!("<h1>{}</h1>", escape_html(&title)));
    html.push_str(&format!(
        "<p style=\"color:#666\">Topic: {}</p>",
        escape_html(topic)
    ));

    // Viral concept
    if let Some(vc) = package.viral_concept_view() {
        if !vc.logline.is_empty() {
            html.push_str(&format!("<p><strong>{}</strong></p>", escape_html(&vc.logline)));
        }
        if !vc.hook.is_empty() {
            html.push_str(&format!("<p>{}</p>", escape_html(&vc.hook)));
        }
        if vc.titles.len() > 1 {
            html.push_str("<h3>Alternate titles</h3>");
            push_list(&mut html, vc.titles.iter().skip(1));
        }
    }

    if let Some(bg) = package.background_research_view() {
        html.push_str("<h2>Background</h2>");
        if !bg.summary.is_empty() {
            html.push_str(&format!("<p>{}</p>", escape_html(&bg.summary)));
        }
        push_list(&mut html, bg.key_facts.iter());
    }

    if let Some(it) = package.interview_targets_view() {
        if !it.targets.is_empty() {
            html.push_str("<h2>Interview targets</h2>");
            push_list(
                &mut html,
                it.targets.iter().map(|t| join_non_empty(&[t.name.as_str(), t.role.as_str()])),
            );
        }
    }

    if let Some(dd) = package.documents_and_data_view() {
        if !dd.documents.is_empty() {
            html.push_str("<h2>Documents &amp; data</h2>");
            push_list(
                &mut html,
                dd.documents
                    .iter()
                    .map(|d| join_non_empty(&[d.title.as_str(), d.source.as_str()])),
            );
        }
    }

    if let Some(foia) = package.foia_suggestions_view() {
        if !foia.requests.is_empty() {
            html.push_str("<h2>FOIA requests</h2>");
            push_list(
                &mut html,
                foia.requests
                    .iter()
                    .map(|r| join_non_empty(&[r.agency.as_str(), r.description.as_str()])),
            );
        }
    }

    if let Some(story) = package.story_structure_view() {
        if !story.acts.is_empty() {
            html.push_str("<h2>Story structure</h2>");
            push_list(
                &mut html,
                story
                    .acts
                    .iter()
                    .map(|a| join_non_empty(&[a.title.as_str(), a.summary.as_str()])),
            );
        }
    }

    if let Some(vs) = package.visual_suggestions_view() {
        let visuals: Vec<&String> = vs
            .archival
            .iter()
            .chain(&vs.recreations)
            .chain(&vs.graphics)
            .chain(&vs.locations)
            .collect();
        if !visuals.is_empty() {
            html.push_str("<h2>Visuals</h2>");
            push_list(&mut html, visuals.into_iter());
        }
    }

    // Unstructured sections, verbatim
    for key in SectionKey::ALL {
        if let Some(raw) = package.section(key).raw() {
            html.push_str(&format!(
                "<h2>{}</h2><pre style=\"white-space:pre-wrap\">{}</pre>",
                key.as_str(),
                escape_html(raw)
            ));
        }
    }

    html.push_str("</body></html>");
    html
}

fn push_list<I, S>(html: &mut String, items: I)
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    let mut opened = false;
    for item in items {
        let item = item.as_ref();
        if item.trim().is_empty() {
            continue;
        }
        if !opened {
            html.push_str("<ul>");
            opened = true;
        }
        html.push_str(&format!("<li>{}</li>", escape_html(item)));
    }
    if opened {
        html.push_str("</ul>");
    }
}

fn join_non_empty(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.trim().is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" - ")
}

/// Minimal HTML escaping for text nodes.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
