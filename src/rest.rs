//! Parse the payload of a `@rest` annotation using PEST.
//!
//! The payload maps an operation onto an HTTP route:
//! `GET /users/{id}?{fields} [header X-Tenant: {tenant}]`. Variables name
//! arguments of the annotated operation; binding them is checked by the
//! annotation pass.

use std::fmt;

use pest::Parser;
use pest_derive::Parser as PestParser;
use serde::{Deserialize, Serialize};

#[derive(PestParser)]
#[grammar = "rest.pest"]
struct RestParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        let method = match name.to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "PATCH" => HttpMethod::Patch,
            _ => return None,
        };
        Some(method)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestAnnotation {
    pub method: HttpMethod,
    /// Path template as written, e.g. `/users/{id}`.
    pub path: String,
    pub path_variables: Vec<String>,
    pub query_variables: Vec<String>,
    /// `(header name, variable)` pairs.
    pub headers: Vec<(String, String)>,
    pub body_variable: Option<String>,
}

impl RestAnnotation {
    /// Every bound variable in declaration order: path, query, headers, body.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.path_variables
            .iter()
            .chain(&self.query_variables)
            .chain(self.headers.iter().map(|(_, var)| var))
            .chain(&self.body_variable)
            .map(String::as_str)
    }
}

impl fmt::Display for RestAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        for (i, var) in self.query_variables.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{{{var}}}")?;
        }
        for (name, var) in &self.headers {
            write!(f, " [header {name}: {{{var}}}]")?;
        }
        if let Some(var) = &self.body_variable {
            write!(f, " [body {{{var}}}]")?;
        }
        Ok(())
    }
}

/// Parse an `@rest` annotation body.
pub fn parse_rest(source: &str) -> Result<RestAnnotation, String> {
    let pairs = RestParser::parse(Rule::rest, source.trim())
        .map_err(|e| format!("invalid @rest annotation: {}", e))?;
    let pair = pairs.into_iter().next().ok_or("Empty @rest annotation")?;

    let mut method = None;
    let mut path = String::new();
    let mut path_variables = Vec::new();
    let mut query_variables = Vec::new();
    let mut headers = Vec::new();
    let mut body_variable = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::method => method = HttpMethod::from_name(inner.as_str()),
            Rule::path => {
                path = inner.as_str().to_string();
                for part in inner.into_inner() {
                    if part.as_rule() == Rule::variable {
                        path_variables.push(variable_name(part)?);
                    }
                }
            }
            Rule::query => {
                for part in inner.into_inner() {
                    query_variables.push(variable_name(part)?);
                }
            }
            Rule::header => {
                let mut it = inner.into_inner();
                let name = it.next().ok_or("header: name")?.as_str().to_string();
                let var = variable_name(it.next().ok_or("header: variable")?)?;
                headers.push((name, var));
            }
            Rule::body => {
                if body_variable.is_some() {
                    return Err("@rest annotation binds more than one body".to_string());
                }
                let var = inner.into_inner().next().ok_or("body: variable")?;
                body_variable = Some(variable_name(var)?);
            }
            _ => {}
        }
    }

    Ok(RestAnnotation {
        method: method.ok_or("@rest annotation: missing method")?,
        path,
        path_variables,
        query_variables,
        headers,
        body_variable,
    })
}

fn variable_name(pair: pest::iterators::Pair<Rule>) -> Result<String, String> {
    pair.into_inner()
        .next()
        .map(|ident| ident.as_str().to_string())
        .ok_or_else(|| "variable: name".to_string())
}
