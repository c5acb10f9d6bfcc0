const DELIMITER: &str = "_____";

#[derive(Debug, Clone, PartialEq, Eq)]
struct ContextSection {
    title: String,
    body: String,
}

/// Ordered, named text sections handed to the decision model. Built once
/// through [`ContextBuilder`] and consumed by [`EvaluationContext::into_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationContext {
    sections: Vec<ContextSection>,
}

#[derive(Debug, Default)]
pub struct ContextBuilder {
    sections: Vec<ContextSection>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(mut self, title: impl Into<String>, body: impl AsRef<str>) -> Self {
        self.sections.push(ContextSection {
            title: title.into(),
            body: body.as_ref().trim().to_string(),
        });
        self
    }

    pub fn optional_section(self, title: impl Into<String>, body: Option<String>) -> Self {
        match body {
            Some(body) => self.section(title, body),
            None => self,
        }
    }

    pub fn build(self) -> EvaluationContext {
        EvaluationContext {
            sections: self.sections,
        }
    }
}

impl EvaluationContext {
    pub fn into_text(self) -> String {
        let mut out = String::new();
        for (idx, section) in self.sections.iter().enumerate() {
            if idx > 0 {
                out.push_str(DELIMITER);
                out.push_str("\n\n");
            }
            out.push_str(&section.title);
            out.push_str(":\n");
            out.push_str(&section.body);
            out.push_str("\n");
        }
        out
    }
}
