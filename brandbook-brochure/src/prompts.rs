//! Prompt text for the two generation phases.

/// System prompt for choosing brochure-worthy links.
pub const LINK_SYSTEM_PROMPT: &str = r#"
You are provided with a list of links found on a webpage.
You are able to decide which of the links would be most relevant to include in a brochure about the company,
such as links to an About page, or a Company page, or Careers/Jobs pages.
You must respond in English only.
You should respond in JSON as in this example:

{
    "links": [
        {"type": "about page", "url": "https://full.url/goes/here/about"},
        {"type": "careers page", "url": "https://another.full.url/careers"}
    ]
}
"#;

/// System prompt for writing the brochure itself.
pub const BROCHURE_SYSTEM_PROMPT: &str = "
You are an assistant that analyzes the contents of several relevant pages from a company website
and creates a short brochure about the company for prospective customers, investors and recruits.
You must respond in English only, regardless of the website's language.
Respond in markdown without code blocks.
Include details of company culture, customers and careers/jobs if you have the information.
";

/// Upper bound, in characters, on the brochure user prompt.
pub const BROCHURE_PROMPT_MAX_CHARS: usize = 5_000;

pub fn links_user_prompt(url: &str, links: &[String]) -> String {
    format!(
        "\nHere is the list of links on the website {url} -\n\
         Please decide which of these are relevant web links for a brochure about the company, \n\
         respond with the full https URL in JSON format.\n\
         Do not include Terms of Service, Privacy, email links.\n\n\
         Links (some might be relative links):\n\n{}",
        links.join("\n")
    )
}

/// Header that precedes the gathered page contents.
pub fn brochure_prompt_header(company: &str) -> String {
    format!(
        "\nYou are looking at a company called: {company}\n\
         Here are the contents of its landing page and other relevant pages;\n\
         use this information to build a short brochure of the company in markdown without code blocks.\n\n\n"
    )
}
