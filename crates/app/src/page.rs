//! The portfolio page the terminal session restyles.

use services::page::{ElementSpec, PageDocument};

fn section(id: &str, heading: &str) -> ElementSpec {
    ElementSpec::new("section")
        .id(id)
        .class("section")
        .child(ElementSpec::new("h2").class("section-title").text(heading))
}

fn nav_link(target: &str, label: &str) -> ElementSpec {
    ElementSpec::new("li").child(
        ElementSpec::new("a")
            .class("nav-link")
            .attr("href", &format!("#{}", target))
            .text(label),
    )
}

pub fn portfolio_baseline() -> ElementSpec {
    let sections = [
        ("home", "Home"),
        ("about", "About"),
        ("experience", "Experience"),
        ("skills", "Skills"),
        ("projects", "Projects"),
        ("github", "GitHub"),
        ("contact", "Contact"),
    ];

    let mut links = ElementSpec::new("ul").class("nav-links");
    let mut main = ElementSpec::new("main").id("main-content");
    for (id, label) in sections {
        links = links.child(nav_link(id, label));
        main = main.child(section(id, label));
    }

    ElementSpec::new("body")
        .child(
            ElementSpec::new("div")
                .id("page-background-base")
                .style("background-color", "#0b0f19"),
        )
        .child(
            ElementSpec::new("div")
                .id("gradient-background")
                .child(ElementSpec::new("div").id("gradient-blob-1").class("blob"))
                .child(ElementSpec::new("div").id("gradient-blob-2").class("blob"))
                .child(ElementSpec::new("div").id("gradient-blob-3").class("blob")),
        )
        .child(ElementSpec::new("nav").id("navbar").child(links))
        .child(main)
        .child(ElementSpec::new("footer").id("footer").text("Built with care"))
        .child(ElementSpec::new("div").id("chat-widget").class("assistant"))
}

pub fn portfolio_page() -> PageDocument {
    PageDocument::new(portfolio_baseline())
}
