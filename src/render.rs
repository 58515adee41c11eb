// 🖼️ HTML pages for the web front end
// Plain string building; every piece of user data goes through `escape`.

use crate::entities::{Account, LedgerEntry};

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} - Bank</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
        body = body
    )
}

fn error_banner(error: Option<&str>) -> String {
    match error {
        Some(msg) if !msg.is_empty() => format!(r#"<p class="error">{}</p>"#, escape(msg)),
        _ => String::new(),
    }
}

pub fn login_page(error: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Login</h1>
{error}
<form method="post" action="/login">
<label>Username <input name="username" required></label>
<label>Password <input name="password" type="password" required></label>
<button type="submit">Login</button>
</form>
<p>No account? <a href="/register">Register</a></p>"#,
        error = error_banner(error)
    );
    layout("Login", &body)
}

pub fn register_page(error: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Register</h1>
{error}
<form method="post" action="/register">
<label>Name <input name="name" required></label>
<label>Date of birth <input name="dob" type="date" required></label>
<label>Gender
<select name="gender">
<option value="Male">Male</option>
<option value="Female">Female</option>
<option value="Other">Other</option>
</select>
</label>
<label>Username <input name="username" required></label>
<label>Password <input name="password" type="password" required></label>
<label>Confirm password <input name="confirm" type="password" required></label>
<button type="submit">Register</button>
</form>
<p>Already registered? <a href="/login">Login</a></p>"#,
        error = error_banner(error)
    );
    layout("Register", &body)
}

pub fn dashboard_page(account: &Account, error: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Welcome, {name}</h1>
{error}
<section class="profile">
<p>Username: {username}</p>
<p>Date of birth: {dob}</p>
<p>Gender: {gender}</p>
<p class="balance">Balance: {balance}</p>
</section>
<form method="post" action="/deposit">
<input name="amount" inputmode="decimal" placeholder="Amount" required>
<button type="submit">Deposit</button>
</form>
<form method="post" action="/withdraw">
<input name="amount" inputmode="decimal" placeholder="Amount" required>
<button type="submit">Withdraw</button>
</form>
<nav><a href="/history">Transaction history</a> | <a href="/logout">Logout</a></nav>"#,
        name = escape(&account.name),
        error = error_banner(error),
        username = escape(&account.username),
        dob = escape(&account.date_of_birth),
        gender = escape(&account.gender),
        balance = account.balance,
    );
    layout("Dashboard", &body)
}

pub fn history_page(account: &Account, entries: &[LedgerEntry]) -> String {
    let rows = if entries.is_empty() {
        r#"<tr><td colspan="3">No transactions yet</td></tr>"#.to_string()
    } else {
        entries
            .iter()
            .map(|entry| {
                format!(
                    r#"<tr class="{class}"><td>{kind}</td><td>{amount}</td><td>{when}</td></tr>"#,
                    class = entry.kind.as_str().to_lowercase(),
                    kind = entry.kind,
                    amount = entry.amount,
                    when = entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let body = format!(
        r#"<h1>Transaction history for {name}</h1>
<p class="balance">Balance: {balance}</p>
<table>
<thead><tr><th>Type</th><th>Amount</th><th>Date</th></tr></thead>
<tbody>
{rows}
</tbody>
</table>
<nav><a href="/dashboard">Back to dashboard</a></nav>"#,
        name = escape(&account.name),
        balance = account.balance,
        rows = rows,
    );
    layout("History", &body)
}
